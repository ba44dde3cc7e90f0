//! Two-paddle ball game, one controller on the right paddle
//!
//! The left paddle follows an `OpponentPolicy`. Each genome plays its own
//! episode of `episode_ticks` ticks from a fresh serve; fitness is the number
//! of points the right paddle won.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::LinearBody;
use super::collision::point_in_rect;
use super::episode::{Episode, EpisodePhase};
use crate::consts::*;
use crate::context::AbortFlag;
use crate::controller::{Controller, FitnessReport, GenomeId, decide_scalar};
use crate::error::{Aborted, ConfigError};
use crate::render::{Frame, PongFrame};

/// Observation size fed to pong controllers
pub const PONG_INPUTS: usize = 3;

/// Behaviour of the left paddle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpponentPolicy {
    /// Never moves
    #[default]
    Idle,
    /// Chases the ball's height
    Tracking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PongRules {
    pub screen: Vec2,
    pub ball_radius: f32,
    /// Serve velocity (pixels per tick)
    pub ball_velocity: Vec2,
    pub paddle_size: Vec2,
    pub paddle_speed: f32,
    /// Gap between each paddle and its side wall
    pub paddle_margin: f32,
    pub episode_ticks: u64,
    /// Outputs above this move the paddle down, others up
    pub decision_threshold: f32,
    pub opponent: OpponentPolicy,
}

impl Default for PongRules {
    fn default() -> Self {
        Self {
            screen: Vec2::new(PONG_WIDTH, PONG_HEIGHT),
            ball_radius: BALL_RADIUS,
            ball_velocity: Vec2::splat(BALL_START_SPEED),
            paddle_size: Vec2::new(PADDLE_WIDTH, PADDLE_HEIGHT),
            paddle_speed: PADDLE_SPEED,
            paddle_margin: PADDLE_MARGIN,
            episode_ticks: PONG_EPISODE_TICKS,
            decision_threshold: 0.0,
            opponent: OpponentPolicy::Idle,
        }
    }
}

impl PongRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.screen.is_finite() && self.screen.x > 0.0 && self.screen.y > 0.0) {
            return Err(ConfigError::invalid(
                "pong.screen",
                format!("must be positive, got {}", self.screen),
            ));
        }
        if !(self.paddle_size.is_finite() && self.paddle_size.min_element() > 0.0) {
            return Err(ConfigError::invalid(
                "pong.paddle_size",
                format!("must be positive, got {}", self.paddle_size),
            ));
        }
        if self.paddle_size.y >= self.screen.y {
            return Err(ConfigError::invalid(
                "pong.paddle_size",
                format!("paddle height {} fills the screen", self.paddle_size.y),
            ));
        }
        if 2.0 * (self.paddle_margin + self.paddle_size.x) >= self.screen.x {
            return Err(ConfigError::invalid(
                "pong.paddle_margin",
                "paddles overlap horizontally",
            ));
        }
        if !(self.ball_radius.is_finite() && self.ball_radius > 0.0) {
            return Err(ConfigError::invalid(
                "pong.ball_radius",
                format!("must be positive, got {}", self.ball_radius),
            ));
        }
        if !self.ball_velocity.is_finite()
            || !self.paddle_speed.is_finite()
            || !self.decision_threshold.is_finite()
        {
            return Err(ConfigError::invalid("pong", "all values must be finite"));
        }
        if self.episode_ticks == 0 {
            return Err(ConfigError::invalid("pong.episode_ticks", "must be at least 1"));
        }
        Ok(())
    }

    pub fn center(&self) -> Vec2 {
        self.screen / 2.0
    }
}

/// One paddle command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    Stay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paddle {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub side: Side,
    /// Last command applied (safe default for a failed decision)
    pub last_move: Move,
}

impl Paddle {
    /// Vertically centered paddle on `side`
    pub fn new(side: Side, rules: &PongRules) -> Self {
        let x = match side {
            Side::Left => rules.paddle_margin,
            Side::Right => rules.screen.x - rules.paddle_margin - rules.paddle_size.x,
        };
        Self {
            pos: Vec2::new(x, (rules.screen.y - rules.paddle_size.y) / 2.0),
            size: rules.paddle_size,
            speed: rules.paddle_speed,
            side,
            last_move: Move::Stay,
        }
    }

    #[inline]
    pub fn mid_y(&self) -> f32 {
        self.pos.y + self.size.y / 2.0
    }

    /// Move one step, staying on screen
    pub fn apply(&mut self, mv: Move, screen_height: f32) {
        let dy = match mv {
            Move::Up => -self.speed,
            Move::Down => self.speed,
            Move::Stay => 0.0,
        };
        self.pos.y = (self.pos.y + dy).clamp(0.0, screen_height - self.size.y);
        self.last_move = mv;
    }
}

/// Result of a ball/paddle contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddleHit {
    /// Near the middle: height snapped to the paddle midpoint
    Center,
    /// Outer third: ball sped up
    Corner,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub body: LinearBody,
    pub radius: f32,
}

impl Ball {
    pub fn new(pos: Vec2, vel: Vec2, radius: f32) -> Self {
        Self {
            body: LinearBody::new(pos, vel),
            radius,
        }
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.body.pos
    }

    /// Move one tick, bouncing off the top and bottom walls
    pub fn advance(&mut self, screen_height: f32) {
        self.body.step();
        let y = self.body.pos.y;
        if y - self.radius <= 0.0 || y + self.radius >= screen_height {
            self.body.vel.y = -self.body.vel.y;
        }
    }

    /// Bounce off `paddle` if the ball center is inside it.
    ///
    /// Every tick of contact flips `vx`, whichever way the ball travels, so a
    /// ball lingering in a paddle's outer third is boosted again each time.
    pub fn check_collision(&mut self, paddle: &Paddle) -> Option<PaddleHit> {
        if !point_in_rect(self.body.pos, paddle.pos, paddle.size) {
            return None;
        }

        self.body.vel.x = -self.body.vel.x;
        let mid = paddle.mid_y();
        if (self.body.pos.y - mid).abs() > paddle.size.y / 3.0 {
            self.body.vel.x *= CORNER_BOOST_X;
            self.body.vel.y *= CORNER_BOOST_Y;
            Some(PaddleHit::Corner)
        } else {
            self.body.pos.y = mid;
            Some(PaddleHit::Center)
        }
    }

    /// Serve again from `center` towards the side that just scored
    pub fn respawn(&mut self, center: Vec2) {
        self.body.pos = center;
        self.body.vel.x = -self.body.vel.x;
    }
}

/// One genome's match against the opponent policy
pub struct PongEpisode {
    rules: PongRules,
    genome: GenomeId,
    controller: Box<dyn Controller>,
    ball: Ball,
    left: Paddle,
    right: Paddle,
    left_score: u32,
    right_score: u32,
    tick: u64,
    decisions: u64,
    phase: EpisodePhase,
}

impl PongEpisode {
    /// Fresh serve from the center with both paddles centered
    pub fn new(rules: PongRules, genome: GenomeId, controller: Box<dyn Controller>) -> Self {
        let ball = Ball::new(rules.center(), rules.ball_velocity, rules.ball_radius);
        let left = Paddle::new(Side::Left, &rules);
        let right = Paddle::new(Side::Right, &rules);
        let phase = if rules.episode_ticks == 0 {
            EpisodePhase::Terminated
        } else {
            EpisodePhase::Running
        };
        Self {
            rules,
            genome,
            controller,
            ball,
            left,
            right,
            left_score: 0,
            right_score: 0,
            tick: 0,
            decisions: 0,
            phase,
        }
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn paddles(&self) -> (&Paddle, &Paddle) {
        (&self.left, &self.right)
    }

    /// (left, right)
    pub fn scores(&self) -> (u32, u32) {
        (self.left_score, self.right_score)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    fn opponent_move(&self) -> Move {
        match self.rules.opponent {
            OpponentPolicy::Idle => Move::Stay,
            OpponentPolicy::Tracking => {
                let dy = self.ball.pos().y - self.left.mid_y();
                if dy.abs() <= self.left.speed {
                    Move::Stay
                } else if dy < 0.0 {
                    Move::Up
                } else {
                    Move::Down
                }
            }
        }
    }

    fn controller_move(&mut self) -> Move {
        let ball = self.ball.pos();
        let observation = [ball.x, ball.y, self.right.pos.y];
        self.decisions += 1;
        match decide_scalar(self.controller.as_ref(), &observation) {
            Ok(output) if output > self.rules.decision_threshold => Move::Down,
            Ok(_) => Move::Up,
            Err(e) => {
                log::debug!("Paddle {} keeps {:?}: {}", self.genome, self.right.last_move, e);
                self.right.last_move
            }
        }
    }
}

impl Episode for PongEpisode {
    const TICK_RATE: u32 = PONG_TICK_RATE;

    fn step(&mut self, abort: &AbortFlag) -> Result<EpisodePhase, Aborted> {
        if self.phase == EpisodePhase::Terminated {
            return Ok(self.phase);
        }
        abort.check()?;
        self.tick += 1;
        let height = self.rules.screen.y;

        let opponent = self.opponent_move();
        self.left.apply(opponent, height);
        let mv = self.controller_move();
        self.right.apply(mv, height);

        self.ball.advance(height);
        if let Some(hit) = self.ball.check_collision(&self.left) {
            log::trace!("Tick {}: left paddle {:?} hit", self.tick, hit);
        }
        if let Some(hit) = self.ball.check_collision(&self.right) {
            log::trace!("Tick {}: right paddle {:?} hit", self.tick, hit);
        }

        let x = self.ball.pos().x;
        if x < 0.0 {
            self.right_score += 1;
            self.ball.respawn(self.rules.center());
        } else if x > self.rules.screen.x {
            self.left_score += 1;
            self.ball.respawn(self.rules.center());
        }

        if self.tick >= self.rules.episode_ticks {
            self.phase = EpisodePhase::Terminated;
            log::debug!(
                "Pong episode {} over: {} : {}",
                self.genome,
                self.left_score,
                self.right_score
            );
        }
        Ok(self.phase)
    }

    fn phase(&self) -> EpisodePhase {
        self.phase
    }

    fn frame(&self, generation: usize) -> Frame {
        Frame::Pong(PongFrame {
            generation,
            tick: self.tick,
            ball: self.ball.pos(),
            ball_radius: self.ball.radius,
            left_paddle: self.left.pos,
            right_paddle: self.right.pos,
            paddle_size: self.rules.paddle_size,
            left_score: self.left_score,
            right_score: self.right_score,
            screen: self.rules.screen,
        })
    }

    fn report(&self) -> FitnessReport {
        let mut report = FitnessReport::new();
        report.record(self.genome, self.right_score as f32);
        report
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::ControllerError;

    fn play(mut episode: PongEpisode) -> PongEpisode {
        let abort = AbortFlag::new();
        while episode.phase() == EpisodePhase::Running {
            episode.step(&abort).unwrap();
        }
        episode
    }

    fn constant(output: f32) -> Box<dyn Controller> {
        Box::new(move |_: &[f32]| -> Vec<f32> { vec![output] })
    }

    /// Keeps the paddle midpoint on the ball's height
    fn follower() -> Box<dyn Controller> {
        Box::new(|obs: &[f32]| -> Vec<f32> {
            let mid = obs[2] + PADDLE_HEIGHT / 2.0;
            vec![if obs[1] > mid { 1.0 } else { -1.0 }]
        })
    }

    fn right_paddle() -> Paddle {
        Paddle::new(Side::Right, &PongRules::default())
    }

    #[test]
    fn test_stationary_ball_scores_nothing() {
        let rules = PongRules {
            ball_velocity: Vec2::ZERO,
            ..Default::default()
        };
        let episode = play(PongEpisode::new(rules, GenomeId(1), constant(1.0)));
        assert_eq!(episode.tick(), 1000);
        assert_eq!(episode.decisions(), 1000);
        assert_eq!(episode.report().get(GenomeId(1)), Some(0.0));
    }

    #[test]
    fn test_paddle_layout_matches_screen() {
        let (left, right) = (Paddle::new(Side::Left, &PongRules::default()), right_paddle());
        assert_eq!(left.pos, Vec2::new(20.0, 240.0));
        assert_eq!(right.pos, Vec2::new(770.0, 240.0));
        assert_eq!(right.mid_y(), 300.0);
    }

    #[test]
    fn test_paddle_stays_on_screen() {
        let mut paddle = right_paddle();
        for _ in 0..100 {
            paddle.apply(Move::Up, PONG_HEIGHT);
        }
        assert_eq!(paddle.pos.y, 0.0);
        for _ in 0..100 {
            paddle.apply(Move::Down, PONG_HEIGHT);
        }
        assert_eq!(paddle.pos.y, PONG_HEIGHT - PADDLE_HEIGHT);
        assert_eq!(paddle.last_move, Move::Down);
    }

    #[test]
    fn test_wall_flips_only_vertical() {
        let mut ball = Ball::new(Vec2::new(400.0, 15.0), Vec2::new(5.0, -5.0), BALL_RADIUS);
        ball.advance(PONG_HEIGHT);
        assert_eq!(ball.body.vel, Vec2::new(5.0, 5.0));

        let mut ball = Ball::new(Vec2::new(400.0, 585.0), Vec2::new(-5.0, 5.0), BALL_RADIUS);
        ball.advance(PONG_HEIGHT);
        assert_eq!(ball.body.vel, Vec2::new(-5.0, -5.0));
    }

    #[test]
    fn test_center_hit_snaps_to_midpoint() {
        let paddle = right_paddle();
        let mut ball = Ball::new(Vec2::new(775.0, 320.0), Vec2::new(5.0, 5.0), BALL_RADIUS);
        assert_eq!(ball.check_collision(&paddle), Some(PaddleHit::Center));
        assert_eq!(ball.body.vel, Vec2::new(-5.0, 5.0));
        assert_eq!(ball.pos().y, 300.0);
    }

    #[test]
    fn test_corner_hit_speeds_up() {
        let paddle = right_paddle();
        let mut ball = Ball::new(Vec2::new(775.0, 350.0), Vec2::new(5.0, 5.0), BALL_RADIUS);
        assert_eq!(ball.check_collision(&paddle), Some(PaddleHit::Corner));
        assert!((ball.body.vel.x + 5.5).abs() < 1e-5);
        assert!((ball.body.vel.y - 6.0).abs() < 1e-5);
        assert_eq!(ball.pos().y, 350.0);
    }

    #[test]
    fn test_receding_ball_inside_paddle_flips_again() {
        let paddle = right_paddle();
        // Already bounced off the corner last tick, still inside the paddle
        let mut ball = Ball::new(Vec2::new(778.0, 350.0), Vec2::new(-5.5, 6.0), BALL_RADIUS);
        assert_eq!(ball.check_collision(&paddle), Some(PaddleHit::Corner));
        assert!((ball.body.vel.x - 6.05).abs() < 1e-5);
        assert!((ball.body.vel.y - 7.2).abs() < 1e-5);

        let mut ball = Ball::new(Vec2::new(775.0, 300.0), Vec2::new(-5.0, 0.0), BALL_RADIUS);
        assert_eq!(ball.check_collision(&paddle), Some(PaddleHit::Center));
        assert_eq!(ball.body.vel, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_side_out_scores_and_respawns() {
        let mut episode = PongEpisode::new(PongRules::default(), GenomeId(3), constant(0.0));
        episode.ball = Ball::new(Vec2::new(3.0, 100.0), Vec2::new(-5.0, 0.0), BALL_RADIUS);
        episode.step(&AbortFlag::new()).unwrap();
        assert_eq!(episode.scores(), (0, 1));
        assert_eq!(episode.ball().pos(), Vec2::new(400.0, 300.0));
        assert_eq!(episode.ball().body.vel, Vec2::new(5.0, 0.0));

        episode.ball = Ball::new(Vec2::new(797.0, 50.0), Vec2::new(5.0, 0.0), BALL_RADIUS);
        episode.step(&AbortFlag::new()).unwrap();
        assert_eq!(episode.scores(), (1, 1));
        assert_eq!(episode.report().get(GenomeId(3)), Some(1.0));
    }

    #[test]
    fn test_failed_decision_keeps_last_direction() {
        struct Broken;
        impl Controller for Broken {
            fn decide(&self, _observation: &[f32]) -> Result<Vec<f32>, ControllerError> {
                Err(ControllerError::NonFinite(f32::NAN))
            }
        }

        let rules = PongRules {
            ball_velocity: Vec2::ZERO,
            ..Default::default()
        };
        let mut episode = PongEpisode::new(rules, GenomeId(1), Box::new(Broken));
        episode.right.last_move = Move::Down;
        let before = episode.right.pos.y;
        episode.step(&AbortFlag::new()).unwrap();
        assert_eq!(episode.right.pos.y, before + PADDLE_SPEED);
        assert_eq!(episode.right.last_move, Move::Down);
    }

    #[test]
    fn test_tracking_opponent_follows_ball() {
        let rules = PongRules {
            ball_velocity: Vec2::ZERO,
            opponent: OpponentPolicy::Tracking,
            ..Default::default()
        };
        let mut episode = PongEpisode::new(rules, GenomeId(1), constant(0.0));
        episode.ball = Ball::new(Vec2::new(400.0, 100.0), Vec2::ZERO, BALL_RADIUS);
        for _ in 0..60 {
            episode.step(&AbortFlag::new()).unwrap();
        }
        assert!((episode.left.mid_y() - 100.0).abs() <= PADDLE_SPEED);
    }

    #[test]
    fn test_follower_outscores_idle_opponent() {
        let episode = play(PongEpisode::new(PongRules::default(), GenomeId(1), follower()));
        let (left, right) = episode.scores();
        assert_eq!(left, 0);
        assert!(right > 0);
    }

    #[test]
    fn test_abort_before_first_tick() {
        let abort = AbortFlag::new();
        abort.request();
        let mut episode = PongEpisode::new(PongRules::default(), GenomeId(1), constant(1.0));
        assert_eq!(episode.step(&abort), Err(Aborted));
        assert_eq!(episode.tick(), 0);
    }

    #[test]
    fn test_rules_validation() {
        assert!(PongRules::default().validate().is_ok());
        let rules = PongRules {
            paddle_size: Vec2::new(10.0, 600.0),
            ..Default::default()
        };
        assert!(rules.validate().is_err());
        let rules = PongRules {
            episode_ticks: 0,
            ..Default::default()
        };
        assert!(rules.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_paddle_hits_never_slow_the_ball(
            x in 760.0f32..790.0,
            y in 200.0f32..400.0,
            vx in -20.0f32..20.0,
            vy in -20.0f32..20.0,
        ) {
            let paddle = right_paddle();
            let mut ball = Ball::new(Vec2::new(x, y), Vec2::new(vx, vy), BALL_RADIUS);
            let before = ball.body.speed();
            let hit = ball.check_collision(&paddle);
            prop_assert!(ball.body.speed() >= before);
            if hit.is_some() {
                prop_assert_eq!(ball.body.vel.x.signum(), -vx.signum());
            }
            if hit != Some(PaddleHit::Corner) {
                prop_assert_eq!(ball.body.vel.y, vy);
            }
        }

        #[test]
        fn prop_speed_non_decreasing_over_episode(
            vx in 1.0f32..8.0,
            vy in -8.0f32..8.0,
            tracking in any::<bool>(),
        ) {
            let rules = PongRules {
                ball_velocity: Vec2::new(vx, vy),
                episode_ticks: 300,
                opponent: if tracking { OpponentPolicy::Tracking } else { OpponentPolicy::Idle },
                ..Default::default()
            };
            let mut episode = PongEpisode::new(rules, GenomeId(1), follower());
            let abort = AbortFlag::new();
            let mut speed = episode.ball().body.speed();
            while episode.phase() == EpisodePhase::Running {
                episode.step(&abort).unwrap();
                let now = episode.ball().body.speed();
                prop_assert!(now >= speed);
                speed = now;
            }
        }
    }
}
