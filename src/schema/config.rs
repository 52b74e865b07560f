//! Configuration types for a cog array search.

use serde::{Deserialize, Serialize};

use super::IterationConfig;

/// Top-level configuration for a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of layouts per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Number of best layouts carried unchanged into the next generation.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
    /// Parent selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Fitness function and objective weights.
    #[serde(default)]
    pub fitness: FitnessConfig,
    /// Restart, generation, mutation and breeding settings.
    #[serde(default)]
    pub iteration: IterationConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            elitism: default_elitism(),
            selection: SelectionMethod::default(),
            fitness: FitnessConfig::default(),
            iteration: IterationConfig::default(),
            random_seed: None,
        }
    }
}

fn default_population_size() -> usize {
    2000
}
fn default_elitism() -> usize {
    2
}

/// Selection method for choosing parents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Rank-based selection.
    RankBased,
    /// Roulette wheel (fitness-proportionate) selection.
    RouletteWheel,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Which objective function scores a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessKind {
    /// Occupancy-normalized rates passed through per-objective response
    /// curves, weighted by normalized weights.
    #[default]
    #[serde(alias = "aac")]
    AverageAffixConversion,
    /// Plain weighted sum of raw rates, weighted by inverted weights.
    #[serde(alias = "invertion_matrix", alias = "im")]
    InversionMatrix,
}

impl FitnessKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::AverageAffixConversion => "average_affix_conversion",
            Self::InversionMatrix => "inversion_matrix",
        }
    }
}

impl std::str::FromStr for FitnessKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "average_affix_conversion" | "aac" => Ok(Self::AverageAffixConversion),
            "inversion_matrix" | "invertion_matrix" | "im" => Ok(Self::InversionMatrix),
            other => Err(ConfigError::UnknownFitnessFunction(other.to_string())),
        }
    }
}

/// Relative importance of the three production statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub build: f64,
    pub flaggy: f64,
    pub exp: f64,
}

impl Weights {
    pub fn new(build: f64, flaggy: f64, exp: f64) -> Self {
        Self { build, flaggy, exp }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// Fitness function selection with the user-supplied weights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitnessConfig {
    #[serde(default)]
    pub function: FitnessKind,
    #[serde(default)]
    pub weights: Weights,
}

// ============================================================================
// Validation
// ============================================================================

/// Search configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown fitness function: {0}")]
    UnknownFitnessFunction(String),
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Elitism {elitism} must be at least 1 and below population size {size}")]
    InvalidElitism { elitism: usize, size: usize },
    #[error("Tournament size must be at least 1")]
    InvalidTournamentSize,
    #[error("Invalid weight {name}: {value} (weights must be finite and non-negative)")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("Restart count must be at least 1")]
    InvalidRestarts,
    #[error("Invalid generation bounds: min {min}, max {max}")]
    InvalidGenerationBounds { min: usize, max: usize },
    #[error("Convergence window length must be at least 1")]
    InvalidWindow,
    #[error("Convergence threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),
    #[error("Probability {name} must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Mutation probabilities sum to {0}, which exceeds 1")]
    MutationProbabilitiesExceedOne(f64),
}

impl SearchConfig {
    /// Validate the search configuration, including the iteration settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }

        if self.elitism == 0 || self.elitism >= self.population_size {
            return Err(ConfigError::InvalidElitism {
                elitism: self.elitism,
                size: self.population_size,
            });
        }

        if let SelectionMethod::Tournament { size } = self.selection
            && size == 0
        {
            return Err(ConfigError::InvalidTournamentSize);
        }

        let w = self.fitness.weights;
        for (name, value) in [("build", w.build), ("flaggy", w.flaggy), ("exp", w.exp)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        self.iteration.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_elitism() {
        let config = SearchConfig {
            population_size: 4,
            elitism: 4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidElitism { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = SearchConfig::default();
        config.fitness.weights.flaggy = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { name: "flaggy", .. })
        ));
    }

    #[test]
    fn test_fitness_kind_aliases() {
        let kind: FitnessKind = serde_json::from_str("\"aac\"").unwrap();
        assert_eq!(kind, FitnessKind::AverageAffixConversion);
        let kind: FitnessKind = serde_json::from_str("\"invertion_matrix\"").unwrap();
        assert_eq!(kind, FitnessKind::InversionMatrix);
        assert!(serde_json::from_str::<FitnessKind>("\"nonsense\"").is_err());

        assert_eq!("im".parse::<FitnessKind>().unwrap(), FitnessKind::InversionMatrix);
        assert!(matches!(
            "standard".parse::<FitnessKind>(),
            Err(ConfigError::UnknownFitnessFunction(_))
        ));
    }

    #[test]
    fn test_serialization() {
        let config = SearchConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.population_size, config.population_size);
        assert_eq!(parsed.iteration.max_generations, config.iteration.max_generations);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: SearchConfig =
            serde_json::from_str(r#"{"population_size": 10, "fitness": {"function": "im"}}"#)
                .unwrap();
        assert_eq!(parsed.population_size, 10);
        assert_eq!(parsed.elitism, 2);
        assert_eq!(parsed.fitness.function, FitnessKind::InversionMatrix);
        assert_eq!(parsed.fitness.weights, Weights::default());
    }
}
