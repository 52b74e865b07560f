//! Validated iteration settings and the convergence policy.

use crate::schema::{BreedingScheme, ConfigError, IterationConfig, StopReason};

/// Immutable, validated iteration settings.
#[derive(Debug, Clone)]
pub struct IterationController {
    config: IterationConfig,
}

impl IterationController {
    /// Validate `config` once; the controller cannot be changed afterwards.
    pub fn new(config: IterationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn num_restarts(&self) -> usize {
        self.config.num_restarts
    }

    pub fn min_generations(&self) -> usize {
        self.config.min_generations
    }

    pub fn max_generations(&self) -> usize {
        self.config.max_generations
    }

    pub fn window_len(&self) -> usize {
        self.config.window_len
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    pub fn num_mutations(&self) -> usize {
        self.config.num_mutations
    }

    pub fn breeding(&self) -> &BreedingScheme {
        &self.config.breeding
    }

    /// Mean absolute change of the last `window_len` generation-to-generation
    /// best-fitness deltas, or `None` while the window is not yet full.
    pub fn trailing_mean_delta(&self, best_history: &[f64]) -> Option<f64> {
        let window = self.config.window_len;
        if best_history.len() < window + 1 {
            return None;
        }

        let recent = &best_history[best_history.len() - window - 1..];
        let total: f64 = recent.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        Some(total / window as f64)
    }

    /// Decide whether a restart stops after `best_history.len()` generations.
    ///
    /// `best_history[i]` is the best fitness after generation `i + 1`.
    pub fn stop_reason(&self, best_history: &[f64]) -> Option<StopReason> {
        let generation = best_history.len();
        if generation < self.config.min_generations {
            return None;
        }
        if generation >= self.config.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        match self.trailing_mean_delta(best_history) {
            Some(mean) if mean < self.config.threshold => Some(StopReason::Converged),
            _ => None,
        }
    }

    pub fn has_converged(&self, best_history: &[f64]) -> bool {
        self.stop_reason(best_history).is_some()
    }
}

impl TryFrom<IterationConfig> for IterationController {
    type Error = ConfigError;

    fn try_from(config: IterationConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(min: usize, max: usize, window: usize, threshold: f64) -> IterationController {
        IterationController::new(
            IterationConfig::default().with_generation_info(min, max, window, threshold),
        )
        .unwrap()
    }

    /// First generation count at which the controller stops.
    fn stopping_point(ctl: &IterationController, sequence: &[f64]) -> (usize, StopReason) {
        (1..=sequence.len())
            .find_map(|g| ctl.stop_reason(&sequence[..g]).map(|r| (g, r)))
            .unwrap()
    }

    #[test]
    fn test_stabilizing_sequence_converges_after_min() {
        let ctl = controller(6, 50, 3, 0.01);
        // Improves by 1.0 for five generations, then flat.
        let sequence: Vec<f64> = (0..50).map(|i| (i.min(5)) as f64).collect();

        // Deltas: 1,1,1,1,1,0,0,0,... The window of three is all zero at g = 9.
        assert_eq!(stopping_point(&ctl, &sequence), (9, StopReason::Converged));
    }

    #[test]
    fn test_converged_early_waits_for_min_generations() {
        let ctl = controller(12, 50, 2, 0.5);
        let sequence = vec![3.0; 50];
        assert_eq!(stopping_point(&ctl, &sequence), (12, StopReason::Converged));
    }

    #[test]
    fn test_non_stabilizing_sequence_hits_max() {
        let ctl = controller(2, 15, 4, 0.5);
        let sequence: Vec<f64> = (0..40).map(|i| i as f64).collect();
        assert_eq!(stopping_point(&ctl, &sequence), (15, StopReason::MaxGenerations));
    }

    #[test]
    fn test_window_must_fill() {
        let ctl = controller(0, 100, 5, 10.0);
        assert!(ctl.trailing_mean_delta(&[1.0, 1.0, 1.0]).is_none());
        assert!(!ctl.has_converged(&[1.0, 1.0, 1.0]));
        assert_eq!(ctl.trailing_mean_delta(&[1.0, 2.0, 2.0, 2.0, 2.0, 4.0]), Some(0.6));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = IterationConfig::default().with_restart_info(0);
        assert!(matches!(
            IterationController::try_from(config),
            Err(ConfigError::InvalidRestarts)
        ));
    }
}
