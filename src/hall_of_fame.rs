//! Best genomes seen across a run
//!
//! Keeps the top 10 champions, sorted by fitness, and persists them as JSON so
//! a later run (or a replay) can pick them up.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::controller::{Genome, GenomeId};

/// Maximum number of champions to keep
pub const MAX_CHAMPIONS: usize = 10;

/// A single hall of fame entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Champion {
    pub genome: Genome,
    pub fitness: f32,
    /// Generation the fitness was achieved in
    pub generation: usize,
}

/// Champion leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HallOfFame {
    pub entries: Vec<Champion>,
}

impl HallOfFame {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a fitness would make the leaderboard
    pub fn qualifies(&self, fitness: f32) -> bool {
        if !fitness.is_finite() {
            return false;
        }
        if self.entries.len() < MAX_CHAMPIONS {
            return true;
        }
        self.entries.last().is_none_or(|e| fitness > e.fitness)
    }

    /// Insert a champion, returning its rank.
    ///
    /// A genome appears at most once; re-adding it only replaces the entry
    /// when the new fitness is higher.
    pub fn add(&mut self, champion: Champion) -> Option<usize> {
        if let Some(i) = self.position_of(champion.genome.id) {
            if self.entries[i].fitness >= champion.fitness {
                return None;
            }
            self.entries.remove(i);
        }
        if !self.qualifies(champion.fitness) {
            return None;
        }

        // Sorted descending; ties keep the earlier champion first
        let pos = self
            .entries
            .iter()
            .position(|e| champion.fitness > e.fitness)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, champion);
        self.entries.truncate(MAX_CHAMPIONS);
        Some(pos + 1)
    }

    fn position_of(&self, id: GenomeId) -> Option<usize> {
        self.entries.iter().position(|e| e.genome.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn top(&self) -> Option<&Champion> {
        self.entries.first()
    }

    /// Load from a JSON file; a missing file yields an empty hall
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No champions at {}, starting fresh", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e),
        };
        let hall: Self = serde_json::from_str(&json).map_err(io::Error::other)?;
        log::info!("Loaded {} champions from {}", hall.len(), path.display());
        Ok(hall)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)?;
        log::info!("Champions saved ({} entries) to {}", self.len(), path.display());
        Ok(())
    }
}
