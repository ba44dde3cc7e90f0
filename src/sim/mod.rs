//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by spawn order)
//! - No rendering or platform dependencies

pub mod body;
pub mod collision;
pub mod episode;
pub mod flappy;
pub mod mask;
pub mod obstacles;
pub mod pong;

pub use body::{GravityBody, LinearBody, displacement};
pub use collision::{bird_pipe_overlap, out_of_bounds, point_in_rect};
pub use episode::{Episode, EpisodePhase, run_episode};
pub use flappy::{Agent, Elimination, FLAPPY_INPUTS, FlappyEpisode, FlappyRules};
pub use mask::{Mask, SpriteSet};
pub use obstacles::{Floor, ObstacleStream, Pipe};
pub use pong::{
    Ball, Move, OpponentPolicy, PONG_INPUTS, Paddle, PaddleHit, PongEpisode, PongRules, Side,
};
