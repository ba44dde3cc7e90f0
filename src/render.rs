//! Rendering sinks
//!
//! Episodes expose read-only `Frame` snapshots. A sink consumes them after the
//! simulation step and can never reach back into simulation state. Headless
//! training uses `NullRenderer`; `TextRenderer` draws an ANSI character grid.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use glam::Vec2;
use serde::Serialize;

use crate::consts::*;

/// Bird as drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BirdView {
    pub pos: Vec2,
    pub tilt: f32,
}

/// Pipe pair as drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PipeView {
    pub x: f32,
    pub gap_top: f32,
    pub gap_bottom: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlappyFrame {
    pub generation: usize,
    pub tick: u64,
    pub score: u32,
    pub birds: Vec<BirdView>,
    pub pipes: Vec<PipeView>,
    pub floor_y: f32,
    pub floor_x: (f32, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongFrame {
    pub generation: usize,
    pub tick: u64,
    pub ball: Vec2,
    pub ball_radius: f32,
    /// Top-left corners
    pub left_paddle: Vec2,
    pub right_paddle: Vec2,
    pub paddle_size: Vec2,
    pub left_score: u32,
    pub right_score: u32,
    pub screen: Vec2,
}

/// Snapshot of one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Frame {
    Flappy(FlappyFrame),
    Pong(PongFrame),
}

/// Consumer of frames
pub trait RenderSink {
    fn present(&mut self, frame: &Frame);

    /// Whether frames should be built and paced at all
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Headless sink: frames are never built
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl RenderSink for NullRenderer {
    fn present(&mut self, _frame: &Frame) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Character-grid renderer for terminals
pub struct TextRenderer<W: Write> {
    out: W,
    cols: usize,
    rows: usize,
    /// Draw every Nth presented frame
    every: u64,
    presented: u64,
    failed: bool,
}

impl TextRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), 60, 30, 1)
    }
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, cols: usize, rows: usize, every: u64) -> Self {
        Self {
            out,
            cols: cols.max(1),
            rows: rows.max(1),
            every: every.max(1),
            presented: 0,
            failed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        let (grid, status) = match frame {
            Frame::Flappy(f) => (self.flappy_grid(f), flappy_status(f)),
            Frame::Pong(p) => (self.pong_grid(p), pong_status(p)),
        };
        // Home cursor, clear screen
        write!(self.out, "\x1b[H\x1b[2J")?;
        for row in grid {
            let line: String = row.into_iter().collect();
            writeln!(self.out, "{}", line)?;
        }
        writeln!(self.out, "{}", status)?;
        self.out.flush()
    }

    fn blank(&self) -> Vec<Vec<char>> {
        vec![vec![' '; self.cols]; self.rows]
    }

    fn cell(&self, p: Vec2, world: Vec2) -> Option<(usize, usize)> {
        if p.x < 0.0 || p.y < 0.0 || p.x >= world.x || p.y >= world.y {
            return None;
        }
        let c = (p.x / world.x * self.cols as f32) as usize;
        let r = (p.y / world.y * self.rows as f32) as usize;
        Some((r.min(self.rows - 1), c.min(self.cols - 1)))
    }

    fn fill_rect(&self, grid: &mut [Vec<char>], min: Vec2, max: Vec2, world: Vec2, ch: char) {
        let lo = min.max(Vec2::ZERO);
        let hi = max.min(world - Vec2::splat(0.01));
        if lo.x > hi.x || lo.y > hi.y {
            return;
        }
        let (Some((r0, c0)), Some((r1, c1))) = (self.cell(lo, world), self.cell(hi, world)) else {
            return;
        };
        for row in grid.iter_mut().take(r1 + 1).skip(r0) {
            for cell in row.iter_mut().take(c1 + 1).skip(c0) {
                *cell = ch;
            }
        }
    }

    fn flappy_grid(&self, f: &FlappyFrame) -> Vec<Vec<char>> {
        let world = Vec2::new(FLAPPY_WIDTH, FLAPPY_HEIGHT);
        let mut grid = self.blank();
        for pipe in &f.pipes {
            let x1 = pipe.x + PIPE_WIDTH as f32;
            self.fill_rect(&mut grid, Vec2::new(pipe.x, 0.0), Vec2::new(x1, pipe.gap_top), world, '#');
            self.fill_rect(
                &mut grid,
                Vec2::new(pipe.x, pipe.gap_bottom),
                Vec2::new(x1, f.floor_y),
                world,
                '#',
            );
        }
        self.fill_rect(
            &mut grid,
            Vec2::new(0.0, f.floor_y),
            Vec2::new(FLAPPY_WIDTH, FLAPPY_HEIGHT),
            world,
            '=',
        );
        for bird in &f.birds {
            let center = bird.pos + Vec2::new(BIRD_WIDTH as f32, BIRD_HEIGHT as f32) / 2.0;
            if let Some((r, c)) = self.cell(center, world) {
                grid[r][c] = if bird.tilt > 0.0 { '^' } else { 'v' };
            }
        }
        grid
    }

    fn pong_grid(&self, p: &PongFrame) -> Vec<Vec<char>> {
        let mut grid = self.blank();
        for paddle in [p.left_paddle, p.right_paddle] {
            self.fill_rect(&mut grid, paddle, paddle + p.paddle_size, p.screen, '|');
        }
        if let Some((r, c)) = self.cell(p.ball, p.screen) {
            grid[r][c] = 'o';
        }
        grid
    }
}

fn flappy_status(f: &FlappyFrame) -> String {
    format!(
        "gen {}  tick {}  score {}  alive {}",
        f.generation,
        f.tick,
        f.score,
        f.birds.len()
    )
}

fn pong_status(p: &PongFrame) -> String {
    format!(
        "gen {}  tick {}  {} : {} (AI)",
        p.generation, p.tick, p.left_score, p.right_score
    )
}

impl<W: Write> RenderSink for TextRenderer<W> {
    fn present(&mut self, frame: &Frame) {
        self.presented += 1;
        if self.failed || (self.presented - 1) % self.every != 0 {
            return;
        }
        if let Err(e) = self.draw(frame) {
            log::warn!("Text renderer disabled after write error: {}", e);
            self.failed = true;
        }
    }

    fn is_enabled(&self) -> bool {
        !self.failed
    }
}

/// Wall-clock pacing for visualization; never consulted by the simulation
#[derive(Debug)]
pub struct FramePacer {
    budget: Duration,
    last: Instant,
}

impl FramePacer {
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            budget: Duration::from_secs(1) / ticks_per_second.max(1),
            last: Instant::now(),
        }
    }

    /// Sleep off whatever is left of this tick's budget
    pub fn wait(&mut self) {
        let elapsed = self.last.elapsed();
        if let Some(rest) = self.budget.checked_sub(elapsed) {
            std::thread::sleep(rest);
        }
        self.last = Instant::now();
    }
}
