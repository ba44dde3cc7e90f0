//! Side-scrolling obstacle game, one bird per controller
//!
//! Tick order:
//! 1. Every alive bird observes the reference pipe and may flap (+survival bonus)
//! 2. Pipes, floor and birds advance
//! 3. Pipe collisions eliminate with a penalty
//! 4. Leaving the play area eliminates without a penalty
//! 5. A passed pipe rewards every bird still alive and spawns its replacement
//! 6. The episode ends when no bird is left

use std::sync::Arc;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::GravityBody;
use super::collision::{bird_pipe_overlap, out_of_bounds};
use super::episode::{Episode, EpisodePhase};
use super::mask::SpriteSet;
use super::obstacles::{Floor, ObstacleStream};
use crate::consts::*;
use crate::context::AbortFlag;
use crate::controller::{Controller, FitnessReport, GenomeId, decide_scalar};
use crate::error::{Aborted, ConfigError};
use crate::render::{BirdView, FlappyFrame, Frame, PipeView};

/// Observation size fed to flappy controllers
pub const FLAPPY_INPUTS: usize = 3;

/// Tunable rules (geometry of sprites stays fixed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlappyRules {
    pub start: Vec2,
    pub floor_y: f32,
    pub pipe_speed: f32,
    pub first_pipe_x: f32,
    pub spawn_x: f32,
    /// Gap top drawn from [gap_min, gap_max)
    pub gap_min: i32,
    pub gap_max: i32,
    pub survival_bonus: f32,
    pub pass_bonus: f32,
    pub collision_penalty: f32,
    pub flap_threshold: f32,
    /// Optional hard stop; `None` runs until every bird is gone
    pub max_ticks: Option<u64>,
}

impl Default for FlappyRules {
    fn default() -> Self {
        Self {
            start: Vec2::new(BIRD_START_X, BIRD_START_Y),
            floor_y: FLOOR_Y,
            pipe_speed: PIPE_SPEED,
            first_pipe_x: PIPE_FIRST_X,
            spawn_x: PIPE_SPAWN_X,
            gap_min: GAP_MIN,
            gap_max: GAP_MAX,
            survival_bonus: SURVIVAL_BONUS,
            pass_bonus: PASS_BONUS,
            collision_penalty: COLLISION_PENALTY,
            flap_threshold: FLAP_THRESHOLD,
            max_ticks: None,
        }
    }
}

impl FlappyRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gap_min >= self.gap_max {
            return Err(ConfigError::invalid(
                "flappy.gap_min",
                format!("empty gap range [{}, {})", self.gap_min, self.gap_max),
            ));
        }
        if !(self.floor_y > BIRD_HEIGHT as f32) {
            return Err(ConfigError::invalid(
                "flappy.floor_y",
                format!("floor at {} leaves no room for the bird", self.floor_y),
            ));
        }
        let finite = [
            self.pipe_speed,
            self.first_pipe_x,
            self.spawn_x,
            self.survival_bonus,
            self.pass_bonus,
            self.collision_penalty,
            self.flap_threshold,
            self.start.x,
            self.start.y,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid("flappy", "all values must be finite"));
        }
        Ok(())
    }
}

/// Why a bird left the episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elimination {
    Collision,
    OutOfBounds,
}

/// One bird and the bookkeeping of the controller flying it
#[derive(Debug, Clone)]
pub struct Agent {
    pub genome: GenomeId,
    pub body: GravityBody,
    pub fitness: f32,
    /// Number of `decide` calls made for this agent
    pub decisions: u64,
    /// Tick and cause of elimination
    pub eliminated: Option<(u64, Elimination)>,
}

impl Agent {
    pub fn is_alive(&self) -> bool {
        self.eliminated.is_none()
    }
}

/// One generation's shared run of every bird
pub struct FlappyEpisode {
    rules: FlappyRules,
    sprites: Arc<SpriteSet>,
    agents: Vec<Agent>,
    controllers: Vec<Box<dyn Controller>>,
    /// Slots of alive agents, rebuilt every tick
    active: Vec<usize>,
    stream: ObstacleStream,
    floor: Floor,
    rng: Pcg32,
    tick: u64,
    score: u32,
    phase: EpisodePhase,
}

impl FlappyEpisode {
    /// Place every bird at the start and pre-spawn the first pipe
    pub fn new(
        rules: FlappyRules,
        sprites: Arc<SpriteSet>,
        entrants: Vec<(GenomeId, Box<dyn Controller>)>,
        seed: u64,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut stream =
            ObstacleStream::new(rules.pipe_speed, rules.spawn_x, (rules.gap_min, rules.gap_max));
        let first_gap = rng.random_range(rules.gap_min..rules.gap_max) as f32;
        stream.push(rules.first_pipe_x, first_gap);

        Self::with_stream(rules, sprites, entrants, stream, rng)
    }

    /// Start from an explicit pipe layout
    pub fn with_stream(
        rules: FlappyRules,
        sprites: Arc<SpriteSet>,
        entrants: Vec<(GenomeId, Box<dyn Controller>)>,
        stream: ObstacleStream,
        rng: Pcg32,
    ) -> Self {
        let (agents, controllers): (Vec<_>, Vec<_>) = entrants
            .into_iter()
            .map(|(genome, controller)| {
                let agent = Agent {
                    genome,
                    body: GravityBody::new(rules.start),
                    fitness: 0.0,
                    decisions: 0,
                    eliminated: None,
                };
                (agent, controller)
            })
            .unzip();
        let active: Vec<usize> = (0..agents.len()).collect();
        let phase = if active.is_empty() {
            EpisodePhase::Terminated
        } else {
            EpisodePhase::Running
        };
        let floor = Floor::new(rules.floor_y, rules.pipe_speed);

        Self {
            rules,
            sprites,
            agents,
            controllers,
            active,
            stream,
            floor,
            rng,
            tick: 0,
            score: 0,
            phase,
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn alive(&self) -> usize {
        self.active.len()
    }

    pub fn stream(&self) -> &ObstacleStream {
        &self.stream
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    fn eliminate(agent: &mut Agent, tick: u64, cause: Elimination) {
        log::trace!("Bird {} eliminated at tick {} ({:?})", agent.genome, tick, cause);
        agent.eliminated = Some((tick, cause));
    }
}

impl Episode for FlappyEpisode {
    const TICK_RATE: u32 = FLAPPY_TICK_RATE;

    fn step(&mut self, abort: &AbortFlag) -> Result<EpisodePhase, Aborted> {
        if self.phase == EpisodePhase::Terminated {
            return Ok(self.phase);
        }
        abort.check()?;
        self.tick += 1;

        // 1. Decide. The reference pipe comes from the lead bird.
        let lead_x = self.agents[self.active[0]].body.pos.x;
        let (gap_top, gap_bottom) = self
            .stream
            .reference_for(lead_x)
            .map_or((0.0, self.rules.floor_y), |p| (p.height, p.bottom()));

        for &slot in &self.active {
            let agent = &mut self.agents[slot];
            let y = agent.body.pos.y;
            let observation = [y, (y - gap_top).abs(), (y - gap_bottom).abs()];
            agent.decisions += 1;
            match decide_scalar(self.controllers[slot].as_ref(), &observation) {
                Ok(output) if output > self.rules.flap_threshold => agent.body.impulse(),
                Ok(_) => {}
                Err(e) => log::debug!("Bird {} holds course: {}", agent.genome, e),
            }
            agent.fitness += self.rules.survival_bonus;
        }

        // 2. Advance the world
        let passed = self.stream.advance(lead_x);
        self.floor.advance();
        for &slot in &self.active {
            self.agents[slot].body.step();
        }

        // 3 & 4. Build the next active set
        let mut next_active = Vec::with_capacity(self.active.len());
        for &slot in &self.active {
            let agent = &mut self.agents[slot];
            let hit = self
                .stream
                .pipes()
                .iter()
                .any(|pipe| bird_pipe_overlap(agent.body.pos, pipe, &self.sprites));
            if hit {
                agent.fitness -= self.rules.collision_penalty;
                Self::eliminate(agent, self.tick, Elimination::Collision);
                continue;
            }
            if out_of_bounds(agent.body.pos.y, BIRD_HEIGHT as f32, self.rules.floor_y) {
                Self::eliminate(agent, self.tick, Elimination::OutOfBounds);
                continue;
            }
            next_active.push(slot);
        }
        self.active = next_active;

        // 5. Reward survivors and replace each passed pipe
        if !passed.is_empty() {
            self.score += 1;
            for &slot in &self.active {
                self.agents[slot].fitness += self.rules.pass_bonus;
            }
            for _ in &passed {
                self.stream.spawn(&mut self.rng);
            }
            log::trace!("Tick {}: pipe passed, score {}", self.tick, self.score);
        }

        // 6. Terminal conditions
        let capped = self.rules.max_ticks.is_some_and(|max| self.tick >= max);
        if self.active.is_empty() || capped {
            self.phase = EpisodePhase::Terminated;
            log::debug!(
                "Flappy episode over at tick {}: score {}, {} birds left",
                self.tick,
                self.score,
                self.active.len()
            );
        }
        Ok(self.phase)
    }

    fn phase(&self) -> EpisodePhase {
        self.phase
    }

    fn frame(&self, generation: usize) -> Frame {
        Frame::Flappy(FlappyFrame {
            generation,
            tick: self.tick,
            score: self.score,
            birds: self
                .active
                .iter()
                .map(|&slot| BirdView {
                    pos: self.agents[slot].body.pos,
                    tilt: self.agents[slot].body.tilt,
                })
                .collect(),
            pipes: self
                .stream
                .pipes()
                .iter()
                .map(|p| PipeView {
                    x: p.x,
                    gap_top: p.height,
                    gap_bottom: p.bottom(),
                })
                .collect(),
            floor_y: self.floor.y,
            floor_x: (self.floor.x1, self.floor.x2),
        })
    }

    fn report(&self) -> FitnessReport {
        let mut report = FitnessReport::new();
        for agent in &self.agents {
            report.record(agent.genome, agent.fitness);
        }
        report
    }
}
