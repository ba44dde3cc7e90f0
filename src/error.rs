//! Error types
//!
//! Three failure classes exist: malformed configuration (fatal at startup),
//! a controller that cannot produce an action (recovered per agent), and an
//! operator abort (hard stop for the whole run).

use thiserror::Error;

/// Configuration could not be loaded or is inconsistent
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("genome {id} has {actual} weights, topology needs {expected}")]
    GenomeShape {
        id: u64,
        expected: usize,
        actual: usize,
    },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// A controller failed to produce a usable action for one tick
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("observation has {actual} values, controller expects {expected}")]
    ObservationSize { expected: usize, actual: usize },

    #[error("controller produced no outputs")]
    EmptyOutput,

    #[error("controller produced a non-finite output: {0}")]
    NonFinite(f32),
}

/// The operator asked to stop; no fitness is reported for the current episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("run aborted by operator")]
pub struct Aborted;

/// Anything that ends a training run early
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Aborted(#[from] Aborted),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
