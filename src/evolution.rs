//! Generation driver
//!
//! Each generation: build one controller per genome, run the game's episodes,
//! collect fitness, then breed the next population. Selection keeps the
//! `elitism` best genomes unchanged and fills the rest with mutated copies of
//! the top `survival_threshold` fraction.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::config::{MutationConfig, TrainingConfig};
use crate::context::SimulationContext;
use crate::controller::{Controller, ControllerFactory, FitnessReport, Genome, GenomeId};
use crate::error::RunError;
use crate::hall_of_fame::{Champion, HallOfFame};
use crate::render::RenderSink;
use crate::sim::{FlappyEpisode, PongEpisode, run_episode};

/// Scores a whole population for the current generation
pub trait Evaluator {
    fn evaluate(
        &mut self,
        genomes: &[Genome],
        ctx: &SimulationContext,
    ) -> Result<FitnessReport, RunError>;
}

/// All birds of a generation share one episode
pub struct FlappyEvaluator<F> {
    factory: F,
    sink: Box<dyn RenderSink>,
}

impl<F: ControllerFactory> FlappyEvaluator<F> {
    pub fn new(factory: F, sink: Box<dyn RenderSink>) -> Self {
        Self { factory, sink }
    }
}

impl<F: ControllerFactory> Evaluator for FlappyEvaluator<F> {
    fn evaluate(
        &mut self,
        genomes: &[Genome],
        ctx: &SimulationContext,
    ) -> Result<FitnessReport, RunError> {
        let entrants = genomes
            .iter()
            .map(|g| Ok((g.id, self.factory.build(g, &ctx.config.topology)?)))
            .collect::<Result<Vec<(GenomeId, Box<dyn Controller>)>, RunError>>()?;
        let mut episode = FlappyEpisode::new(
            ctx.config.flappy.clone(),
            ctx.sprites.clone(),
            entrants,
            ctx.episode_seed(),
        );
        let report = run_episode(&mut episode, ctx, self.sink.as_mut())?;
        log::debug!(
            "Generation {}: flappy episode ran {} ticks, score {}",
            ctx.generation(),
            episode.tick(),
            episode.score()
        );
        Ok(report)
    }
}

/// Every genome plays its own pong episode in turn
pub struct PongEvaluator<F> {
    factory: F,
    sink: Box<dyn RenderSink>,
}

impl<F: ControllerFactory> PongEvaluator<F> {
    pub fn new(factory: F, sink: Box<dyn RenderSink>) -> Self {
        Self { factory, sink }
    }
}

impl<F: ControllerFactory> Evaluator for PongEvaluator<F> {
    fn evaluate(
        &mut self,
        genomes: &[Genome],
        ctx: &SimulationContext,
    ) -> Result<FitnessReport, RunError> {
        let mut report = FitnessReport::new();
        for genome in genomes {
            let controller = self.factory.build(genome, &ctx.config.topology)?;
            let mut episode = PongEpisode::new(ctx.config.pong.clone(), genome.id, controller);
            report.extend(run_episode(&mut episode, ctx, self.sink.as_mut())?);
        }
        Ok(report)
    }
}

/// Fitness summary of one generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best: f32,
    pub mean: f32,
    pub worst: f32,
    pub best_id: Option<GenomeId>,
}

impl GenerationStats {
    pub fn from_report(generation: usize, report: &FitnessReport) -> Self {
        let best = report.best();
        let (sum, worst) = report
            .iter()
            .fold((0.0f32, f32::INFINITY), |(sum, worst), (_, f)| (sum + f, worst.min(f)));
        let count = report.len().max(1) as f32;
        Self {
            generation,
            best: best.map_or(0.0, |(_, f)| f),
            mean: sum / count,
            worst: if report.is_empty() { 0.0 } else { worst },
            best_id: best.map(|(id, _)| id),
        }
    }
}

/// Genomes under evolution
#[derive(Debug, Clone)]
pub struct Population {
    genomes: Vec<Genome>,
    rng: Pcg32,
    next_id: u64,
    mutation: MutationConfig,
}

impl Population {
    /// Random initial population
    pub fn new(
        size: usize,
        genome_len: usize,
        weight_range: f32,
        mutation: MutationConfig,
        seed: u64,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let genomes: Vec<Genome> = (0..size as u64)
            .map(|i| Genome::random(GenomeId(i + 1), genome_len, weight_range, &mut rng))
            .collect();
        Self {
            next_id: size as u64 + 1,
            genomes,
            rng,
            mutation,
        }
    }

    pub fn from_config(config: &TrainingConfig, genome_len: usize) -> Self {
        Self::new(
            config.population_size,
            genome_len,
            config.topology.weight_range,
            config.mutation.clone(),
            config.seed,
        )
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// Replace the first genomes with previously saved ones of matching shape.
    ///
    /// Returns how many were taken.
    pub fn seed_with<'a>(&mut self, saved: impl IntoIterator<Item = &'a Genome>) -> usize {
        let saved: Vec<&Genome> = saved.into_iter().collect();
        // Saved ids come from an earlier run; renumber so they never collide
        if let Some(max) = saved.iter().map(|g| g.id.0).max() {
            if self.next_id <= max {
                self.next_id = max + 1;
                for genome in &mut self.genomes {
                    genome.id = GenomeId(self.next_id);
                    self.next_id += 1;
                }
            }
        }

        let len = self.genomes.first().map_or(0, |g| g.weights.len());
        let mut taken = 0;
        for genome in saved {
            if taken == self.genomes.len() {
                break;
            }
            if genome.weights.len() != len {
                log::warn!(
                    "Skipping saved genome {}: {} weights, expected {}",
                    genome.id,
                    genome.weights.len(),
                    len
                );
                continue;
            }
            self.genomes[taken] = Genome {
                id: GenomeId(self.next_id),
                weights: genome.weights.clone(),
            };
            self.next_id += 1;
            taken += 1;
        }
        taken
    }

    /// Run every configured generation, recording champions in `hall`
    pub fn run(
        &mut self,
        evaluator: &mut dyn Evaluator,
        ctx: &mut SimulationContext,
        hall: &mut HallOfFame,
    ) -> Result<Vec<GenerationStats>, RunError> {
        let mut history = Vec::with_capacity(ctx.config.generations);
        for _ in 0..ctx.config.generations {
            history.push(self.step(evaluator, ctx, hall)?);
        }
        Ok(history)
    }

    /// Evaluate the current generation and breed the next one
    pub fn step(
        &mut self,
        evaluator: &mut dyn Evaluator,
        ctx: &mut SimulationContext,
        hall: &mut HallOfFame,
    ) -> Result<GenerationStats, RunError> {
        ctx.abort.check()?;
        let generation = ctx.begin_generation();
        let report = evaluator.evaluate(&self.genomes, ctx)?;

        let stats = GenerationStats::from_report(generation, &report);
        log::info!(
            "Generation {}: best {:.2} ({}), mean {:.2}, worst {:.2}",
            stats.generation,
            stats.best,
            stats.best_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            stats.mean,
            stats.worst
        );

        for genome in &self.genomes {
            if let Some(fitness) = report.get(genome.id) {
                if hall.qualifies(fitness) {
                    hall.add(Champion {
                        genome: genome.clone(),
                        fitness,
                        generation,
                    });
                }
            }
        }

        self.reproduce(&report);
        Ok(stats)
    }

    /// Breed the next generation from `report`
    fn reproduce(&mut self, report: &FitnessReport) {
        let size = self.genomes.len();
        if size == 0 {
            return;
        }
        let mut ranked: Vec<(f32, Genome)> = self
            .genomes
            .drain(..)
            .map(|g| (report.get(g.id).unwrap_or(f32::NEG_INFINITY), g))
            .collect();
        // Stable: equal fitness keeps evaluation order
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        let elites = self.mutation.elitism.min(size);
        let parents =
            ((size as f32 * self.mutation.survival_threshold).ceil() as usize).clamp(1, size);

        let mut next: Vec<Genome> = ranked[..elites].iter().map(|(_, g)| g.clone()).collect();
        while next.len() < size {
            let parent = &ranked[self.rng.random_range(0..parents)].1;
            let mut child = Genome {
                id: GenomeId(self.next_id),
                weights: parent.weights.clone(),
            };
            self.next_id += 1;
            child.mutate(self.mutation.rate, self.mutation.power, &mut self.rng);
            next.push(child);
        }
        self.genomes = next;
    }
}
