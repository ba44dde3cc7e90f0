//! Training configuration
//!
//! Loaded from a JSON file. Every field has a default, so a partial file (or
//! none at all) is valid. Validation runs once at startup, before any episode.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::flappy::FlappyRules;
use crate::sim::pong::PongRules;

/// Neuron activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Sigmoid,
    Tanh,
    Relu,
}

impl Activation {
    #[inline]
    pub fn apply(&self, x: f32) -> f32 {
        match self {
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
        }
    }
}

/// Network shape handed to the controller factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Hidden layer sizes (empty = direct input -> output)
    pub hidden: Vec<usize>,
    /// Activation for every layer (None = the game's default)
    pub activation: Option<Activation>,
    /// Initial weights are drawn from [-weight_range, weight_range]
    pub weight_range: f32,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            hidden: Vec::new(),
            activation: None,
            weight_range: 1.0,
        }
    }
}

/// Reference driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Probability that a single weight is perturbed
    pub rate: f32,
    /// Perturbation is drawn from [-power, power]
    pub power: f32,
    /// Best genomes copied unchanged into the next generation
    pub elitism: usize,
    /// Fraction of the ranked population allowed to reproduce
    pub survival_threshold: f32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            rate: 0.8,
            power: 0.5,
            elitism: 2,
            survival_threshold: 0.2,
        }
    }
}

/// Complete training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Genomes evaluated per generation
    pub population_size: usize,
    /// Number of generations to run
    pub generations: usize,
    /// Run seed (pipe gaps, initial weights, mutation)
    pub seed: u64,
    pub topology: TopologyConfig,
    pub mutation: MutationConfig,
    pub flappy: FlappyRules,
    pub pong: PongRules,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 50,
            seed: 0x5eed,
            topology: TopologyConfig::default(),
            mutation: MutationConfig::default(),
            flappy: FlappyRules::default(),
            pong: PongRules::default(),
        }
    }
}

impl TrainingConfig {
    /// Read, parse and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no episode or driver could run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::invalid(
                "population_size",
                format!("need at least 2 genomes, got {}", self.population_size),
            ));
        }
        if self.generations == 0 {
            return Err(ConfigError::invalid("generations", "must be at least 1"));
        }
        if let Some(pos) = self.topology.hidden.iter().position(|&n| n == 0) {
            return Err(ConfigError::invalid(
                "topology.hidden",
                format!("layer {} has zero neurons", pos),
            ));
        }
        if !(self.topology.weight_range.is_finite() && self.topology.weight_range > 0.0) {
            return Err(ConfigError::invalid(
                "topology.weight_range",
                format!("must be positive, got {}", self.topology.weight_range),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation.rate) {
            return Err(ConfigError::invalid(
                "mutation.rate",
                format!("must be in [0, 1], got {}", self.mutation.rate),
            ));
        }
        if !(self.mutation.power.is_finite() && self.mutation.power >= 0.0) {
            return Err(ConfigError::invalid(
                "mutation.power",
                format!("must be non-negative, got {}", self.mutation.power),
            ));
        }
        if self.mutation.elitism >= self.population_size {
            return Err(ConfigError::invalid(
                "mutation.elitism",
                format!(
                    "{} elites leaves no room in a population of {}",
                    self.mutation.elitism, self.population_size
                ),
            ));
        }
        if !(self.mutation.survival_threshold > 0.0 && self.mutation.survival_threshold <= 1.0) {
            return Err(ConfigError::invalid(
                "mutation.survival_threshold",
                format!("must be in (0, 1], got {}", self.mutation.survival_threshold),
            ));
        }
        self.flappy.validate()?;
        self.pong.validate()?;
        Ok(())
    }
}
