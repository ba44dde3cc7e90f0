//! Neuro Arcade - evolving controllers for two arcade simulations
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, collisions, episodes)
//! - `controller`: Observation -> action contract and the feed-forward network
//! - `evolution`: Population driver that scores genomes through episodes
//! - `render`: Read-only frame snapshots and render sinks
//! - `config`: Training configuration (JSON)
//! - `context`: Process-wide simulation context

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod evolution;
pub mod hall_of_fame;
pub mod render;
pub mod sim;

pub use config::TrainingConfig;
pub use context::{AbortFlag, SimulationContext};
pub use error::{Aborted, ConfigError, ControllerError, RunError};
pub use hall_of_fame::HallOfFame;

/// Game configuration constants
pub mod consts {
    /// Flappy window dimensions
    pub const FLAPPY_WIDTH: f32 = 600.0;
    pub const FLAPPY_HEIGHT: f32 = 800.0;

    /// Bird start position and sprite size (scaled 2x)
    pub const BIRD_START_X: f32 = 230.0;
    pub const BIRD_START_Y: f32 = 350.0;
    pub const BIRD_WIDTH: u32 = 68;
    pub const BIRD_HEIGHT: u32 = 48;

    /// Gravity integration: d = v*t + 0.5*a*t^2
    pub const GRAVITY: f32 = 3.0;
    /// Velocity set by a flap
    pub const IMPULSE_VELOCITY: f32 = -10.5;
    /// Maximum displacement per tick (either direction)
    pub const TERMINAL_VELOCITY: f32 = 16.0;
    /// Extra upward kick applied to rising displacement
    pub const RISE_BIAS: f32 = 2.0;

    /// Tilt limits (degrees, cosmetic only)
    pub const MAX_ROTATION: f32 = 25.0;
    pub const ROTATION_VELOCITY: f32 = 20.0;
    pub const MIN_ROTATION: f32 = -90.0;

    /// Pipe geometry (sprite scaled 2x)
    pub const PIPE_WIDTH: u32 = 104;
    pub const PIPE_HEIGHT: u32 = 640;
    pub const PIPE_GAP: f32 = 200.0;
    pub const PIPE_SPEED: f32 = 5.0;
    pub const PIPE_FIRST_X: f32 = 700.0;
    pub const PIPE_SPAWN_X: f32 = 600.0;
    /// Gap top is drawn from [GAP_MIN, GAP_MAX)
    pub const GAP_MIN: i32 = 50;
    pub const GAP_MAX: i32 = 450;

    /// Floor line and tile width
    pub const FLOOR_Y: f32 = 730.0;
    pub const FLOOR_WIDTH: f32 = 672.0;

    /// Flappy fitness rules
    pub const SURVIVAL_BONUS: f32 = 0.1;
    pub const PASS_BONUS: f32 = 5.0;
    pub const COLLISION_PENALTY: f32 = 1.0;
    pub const FLAP_THRESHOLD: f32 = 0.5;

    /// Pong screen dimensions
    pub const PONG_WIDTH: f32 = 800.0;
    pub const PONG_HEIGHT: f32 = 600.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 10.0;
    pub const BALL_START_SPEED: f32 = 5.0;
    /// Corner hit speed-up (multiplicative)
    pub const CORNER_BOOST_X: f32 = 1.1;
    pub const CORNER_BOOST_Y: f32 = 1.2;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 10.0;
    pub const PADDLE_HEIGHT: f32 = 120.0;
    pub const PADDLE_SPEED: f32 = 7.0;
    pub const PADDLE_MARGIN: f32 = 20.0;

    /// Ticks per pong episode
    pub const PONG_EPISODE_TICKS: u64 = 1000;

    /// Visualization pacing (ticks per second)
    pub const FLAPPY_TICK_RATE: u32 = 30;
    pub const PONG_TICK_RATE: u32 = 60;
}
