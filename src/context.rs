//! Process-wide simulation context
//!
//! Owns the shared sprite descriptors, the generation counter and the
//! operator abort flag. Created by the entry point, passed by reference to
//! drivers and episodes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::config::TrainingConfig;
use crate::error::{Aborted, ConfigError};
use crate::sim::mask::SpriteSet;

/// Operator stop request, shared across threads
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Aborted)` once a stop was requested
    #[inline]
    pub fn check(&self) -> Result<(), Aborted> {
        if self.is_requested() { Err(Aborted) } else { Ok(()) }
    }
}

/// Everything a run shares between generations
#[derive(Debug)]
pub struct SimulationContext {
    pub config: TrainingConfig,
    pub sprites: Arc<SpriteSet>,
    pub abort: AbortFlag,
    generation: usize,
    started: Instant,
}

impl SimulationContext {
    /// Validate the config and build shared resources
    pub fn init(config: TrainingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "Simulation context ready: population {}, {} generations, seed {}",
            config.population_size,
            config.generations,
            config.seed
        );
        Ok(Self {
            config,
            sprites: Arc::new(SpriteSet::new()),
            abort: AbortFlag::new(),
            generation: 0,
            started: Instant::now(),
        })
    }

    /// Current generation (1-based once the first generation began)
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn begin_generation(&mut self) -> usize {
        self.generation += 1;
        self.generation
    }

    /// Seed for the current generation's episode RNG
    pub fn episode_seed(&self) -> u64 {
        self.config
            .seed
            .wrapping_add((self.generation as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    pub fn shutdown(self) {
        log::info!(
            "Shutting down after {} generations ({:.1}s)",
            self.generation,
            self.started.elapsed().as_secs_f32()
        );
    }
}
