//! Iteration settings and run statistics for the evolutionary search.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Restart, generation, mutation and breeding settings.
///
/// Plain data; validated into an
/// [`IterationController`](crate::compute::evolution::IterationController)
/// before a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationConfig {
    /// Number of independent restarts.
    #[serde(default = "default_restarts")]
    pub num_restarts: usize,
    /// Generations that always run before convergence may stop a restart.
    #[serde(default = "default_min_generations")]
    pub min_generations: usize,
    /// Hard ceiling on generations per restart.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Number of trailing best-fitness deltas averaged for convergence.
    #[serde(default = "default_window_len")]
    pub window_len: usize,
    /// Mean delta below which a restart counts as converged.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Mutation events applied per generation.
    #[serde(default = "default_num_mutations")]
    pub num_mutations: usize,
    /// Operator probabilities.
    #[serde(default)]
    pub breeding: BreedingScheme,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            num_restarts: default_restarts(),
            min_generations: default_min_generations(),
            max_generations: default_max_generations(),
            window_len: default_window_len(),
            threshold: default_threshold(),
            num_mutations: default_num_mutations(),
            breeding: BreedingScheme::default(),
        }
    }
}

fn default_restarts() -> usize {
    1
}
fn default_min_generations() -> usize {
    100
}
fn default_max_generations() -> usize {
    400
}
fn default_window_len() -> usize {
    10
}
fn default_threshold() -> f64 {
    0.01
}
fn default_num_mutations() -> usize {
    800
}

impl IterationConfig {
    pub fn with_restart_info(mut self, num_restarts: usize) -> Self {
        self.num_restarts = num_restarts;
        self
    }

    pub fn with_generation_info(
        mut self,
        min_generations: usize,
        max_generations: usize,
        window_len: usize,
        threshold: f64,
    ) -> Self {
        self.min_generations = min_generations;
        self.max_generations = max_generations;
        self.window_len = window_len;
        self.threshold = threshold;
        self
    }

    pub fn with_mutation_info(mut self, num_mutations: usize) -> Self {
        self.num_mutations = num_mutations;
        self
    }

    pub fn with_breeding_scheme_info(mut self, crossover: f64, one_point: f64, two_point: f64) -> Self {
        self.breeding = BreedingScheme {
            crossover,
            one_point,
            two_point,
        };
        self
    }

    /// Check ranges. Called once when building a controller.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_restarts == 0 {
            return Err(ConfigError::InvalidRestarts);
        }

        if self.max_generations == 0 || self.min_generations > self.max_generations {
            return Err(ConfigError::InvalidGenerationBounds {
                min: self.min_generations,
                max: self.max_generations,
            });
        }

        if self.window_len == 0 {
            return Err(ConfigError::InvalidWindow);
        }

        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }

        self.breeding.validate()
    }
}

/// Probabilities of the genetic operators.
///
/// Crossover is decided once per offspring. The two mutation kinds are
/// mutually exclusive per mutation event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreedingScheme {
    pub crossover: f64,
    pub one_point: f64,
    pub two_point: f64,
}

impl Default for BreedingScheme {
    fn default() -> Self {
        Self {
            crossover: 0.5,
            one_point: 0.25,
            two_point: 0.25,
        }
    }
}

impl BreedingScheme {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("crossover", self.crossover),
            ("one_point", self.one_point),
            ("two_point", self.two_point),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }

        let mutation_total = self.one_point + self.two_point;
        if mutation_total > 1.0 + 1e-9 {
            return Err(ConfigError::MutationProbabilitiesExceedOne(mutation_total));
        }

        Ok(())
    }

    /// Probability that a mutation event is one-point rather than two-point,
    /// or `None` when neither mutation can fire.
    pub fn one_point_share(&self) -> Option<f64> {
        let total = self.one_point + self.two_point;
        (total > 0.0).then(|| self.one_point / total)
    }
}

// ============================================================================
// Progress and results
// ============================================================================

/// Why a restart stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Trailing mean best-fitness delta fell below the threshold.
    Converged,
    /// Reached the generation ceiling.
    MaxGenerations,
}

/// Per-generation statistics of one restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f64>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f64>,
    /// Standard deviation per generation.
    pub fitness_std: Vec<f64>,
    /// Objective probe traces, keyed by probe name.
    pub objectives: BTreeMap<String, ObjectiveTrace>,
}

/// Values of one objective probe across generations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectiveTrace {
    /// Probe value on the generation-best layout.
    pub of_best: Vec<f64>,
    /// Maximum probe value across the generation.
    pub max: Vec<f64>,
}

/// Snapshot handed to progress callbacks after each generation.
#[derive(Debug, Clone, Serialize)]
pub struct EvolutionProgress {
    /// Zero-based restart index.
    pub restart: usize,
    /// Generations completed in this restart.
    pub generation: usize,
    /// Generation ceiling.
    pub max_generations: usize,
    /// Best fitness across all restarts so far.
    pub best_fitness: f64,
    /// Best fitness in the current generation.
    pub generation_best: f64,
    /// Mean fitness in the current generation.
    pub avg_fitness: f64,
}

/// Overall run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations run, summed over restarts.
    pub generations: usize,
    /// Total fitness evaluations.
    pub total_evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Seed the run was started from, if known.
    pub random_seed: Option<u64>,
}
