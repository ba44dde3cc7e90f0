//! Controllers: observation -> action
//!
//! A `Controller` is a stateless function of one observation. Episodes only
//! read the first output. The evolutionary side hands over `Genome`s, and a
//! `ControllerFactory` turns each one into a controller for one episode.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{Activation, TopologyConfig};
use crate::error::{ConfigError, ControllerError};

/// Opaque genome identifier, stable across generations for unchanged elites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenomeId(pub u64);

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Maps an observation to an action vector
pub trait Controller {
    fn decide(&self, observation: &[f32]) -> Result<Vec<f32>, ControllerError>;
}

impl<F> Controller for F
where
    F: Fn(&[f32]) -> Vec<f32>,
{
    fn decide(&self, observation: &[f32]) -> Result<Vec<f32>, ControllerError> {
        Ok(self(observation))
    }
}

/// Invoke a controller and extract a usable first output
pub fn decide_scalar(
    controller: &dyn Controller,
    observation: &[f32],
) -> Result<f32, ControllerError> {
    let outputs = controller.decide(observation)?;
    let first = *outputs.first().ok_or(ControllerError::EmptyOutput)?;
    if !first.is_finite() {
        return Err(ControllerError::NonFinite(first));
    }
    Ok(first)
}

/// Flat parameter vector plus identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub id: GenomeId,
    pub weights: Vec<f32>,
}

impl Genome {
    /// Uniform random weights in [-range, range]
    pub fn random(id: GenomeId, len: usize, range: f32, rng: &mut impl Rng) -> Self {
        Self {
            id,
            weights: (0..len).map(|_| rng.random_range(-range..=range)).collect(),
        }
    }

    /// Perturb each weight with probability `rate` by a value in [-power, power]
    pub fn mutate(&mut self, rate: f32, power: f32, rng: &mut impl Rng) {
        if power <= 0.0 {
            return;
        }
        for w in &mut self.weights {
            if rng.random::<f32>() < rate {
                *w += rng.random_range(-power..=power);
            }
        }
    }
}

/// Builds one controller per genome
pub trait ControllerFactory {
    fn build(
        &self,
        genome: &Genome,
        topology: &TopologyConfig,
    ) -> Result<Box<dyn Controller>, ConfigError>;

    /// Number of weights a genome needs for `topology`
    fn genome_len(&self, topology: &TopologyConfig) -> usize;
}

/// Dense layer: `outputs` rows of `inputs` weights, plus one bias per row
#[derive(Debug, Clone, PartialEq)]
struct Layer {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Layer {
    fn param_count(inputs: usize, outputs: usize) -> usize {
        inputs * outputs + outputs
    }

    fn forward(&self, input: &[f32], activation: Activation) -> Vec<f32> {
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.biases)
            .map(|(row, bias)| {
                let sum: f32 = row.iter().zip(input).map(|(w, x)| w * x).sum();
                activation.apply(sum + bias)
            })
            .collect()
    }
}

/// Fixed-topology feed-forward network
#[derive(Debug, Clone, PartialEq)]
pub struct FeedForward {
    inputs: usize,
    layers: Vec<Layer>,
    activation: Activation,
}

impl FeedForward {
    fn layer_sizes(inputs: usize, outputs: usize, hidden: &[usize]) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(inputs);
        sizes.extend_from_slice(hidden);
        sizes.push(outputs);
        sizes
    }

    pub fn param_count(inputs: usize, outputs: usize, hidden: &[usize]) -> usize {
        Self::layer_sizes(inputs, outputs, hidden)
            .windows(2)
            .map(|w| Layer::param_count(w[0], w[1]))
            .sum()
    }

    /// Slice a flat weight vector into layers
    pub fn from_weights(
        inputs: usize,
        outputs: usize,
        hidden: &[usize],
        activation: Activation,
        weights: &[f32],
    ) -> Option<Self> {
        if weights.len() != Self::param_count(inputs, outputs, hidden) {
            return None;
        }
        let mut offset = 0;
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        for w in Self::layer_sizes(inputs, outputs, hidden).windows(2) {
            let (n_in, n_out) = (w[0], w[1]);
            let weights_end = offset + n_in * n_out;
            let biases_end = weights_end + n_out;
            layers.push(Layer {
                inputs: n_in,
                outputs: n_out,
                weights: weights[offset..weights_end].to_vec(),
                biases: weights[weights_end..biases_end].to_vec(),
            });
            offset = biases_end;
        }
        Some(Self {
            inputs,
            layers,
            activation,
        })
    }

    pub fn outputs(&self) -> usize {
        self.layers.last().map_or(self.inputs, |l| l.outputs)
    }
}

impl Controller for FeedForward {
    fn decide(&self, observation: &[f32]) -> Result<Vec<f32>, ControllerError> {
        if observation.len() != self.inputs {
            return Err(ControllerError::ObservationSize {
                expected: self.inputs,
                actual: observation.len(),
            });
        }
        let mut signal = observation.to_vec();
        for layer in &self.layers {
            signal = layer.forward(&signal, self.activation);
        }
        Ok(signal)
    }
}

/// Factory for `FeedForward` controllers with fixed input/output counts
#[derive(Debug, Clone, Copy)]
pub struct FeedForwardFactory {
    pub inputs: usize,
    pub outputs: usize,
    /// Used when the topology leaves the activation unset
    pub default_activation: Activation,
}

impl FeedForwardFactory {
    pub fn new(inputs: usize, outputs: usize, default_activation: Activation) -> Self {
        Self {
            inputs,
            outputs,
            default_activation,
        }
    }
}

impl ControllerFactory for FeedForwardFactory {
    fn build(
        &self,
        genome: &Genome,
        topology: &TopologyConfig,
    ) -> Result<Box<dyn Controller>, ConfigError> {
        let activation = topology.activation.unwrap_or(self.default_activation);
        FeedForward::from_weights(
            self.inputs,
            self.outputs,
            &topology.hidden,
            activation,
            &genome.weights,
        )
        .map(|net| Box::new(net) as Box<dyn Controller>)
        .ok_or(ConfigError::GenomeShape {
            id: genome.id.0,
            expected: self.genome_len(topology),
            actual: genome.weights.len(),
        })
    }

    fn genome_len(&self, topology: &TopologyConfig) -> usize {
        FeedForward::param_count(self.inputs, self.outputs, &topology.hidden)
    }
}

/// Per-genome fitness for one generation, in evaluation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessReport {
    entries: Vec<(GenomeId, f32)>,
}

impl FitnessReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: GenomeId, fitness: f32) {
        self.entries.push((id, fitness));
    }

    pub fn get(&self, id: GenomeId) -> Option<f32> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|&(_, f)| f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GenomeId, f32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest fitness (first wins on ties)
    pub fn best(&self) -> Option<(GenomeId, f32)> {
        self.iter().fold(None, |best, (id, f)| match best {
            Some((_, bf)) if bf >= f => best,
            _ => Some((id, f)),
        })
    }

    pub fn extend(&mut self, other: FitnessReport) {
        self.entries.extend(other.entries);
    }
}
