//! Fitness functions for scoring cog array layouts.
//!
//! Two objectives are provided. The curved objective normalizes each rate by
//! the number of occupied slots and passes it through a per-objective
//! response curve, so that the three statistics land in comparable ranges.
//! The linear objective is a plain weighted sum and is meant to be paired
//! with [`invert_weights`], which rescales user weights to the raw magnitudes
//! of the statistics.

use std::fmt;

use crate::compute::CogArray;
use crate::schema::{FitnessConfig, FitnessKind, Weights};

/// Typical magnitude of a layout's build rate.
pub const BUILD_SCALE: f64 = 7000.0;
/// Typical magnitude of a layout's flaggy rate.
pub const FLAGGY_SCALE: f64 = 2000.0;
/// Typical magnitude of a layout's experience multiplier.
pub const EXP_SCALE: f64 = 3.0;

const BUILD_NORMALIZER: f64 = 3.0 / 5.5;
const FLAGGY_NORMALIZER: f64 = 3.0 / 11.0;
const EXP_NORMALIZER: f64 = 3.0 / 11.0;

const FLAGGY_EXPONENT: f64 = 1.25;

// Experience response: high-order term + near-linear term + offset.
const EXP_HIGH_COEFF: f64 = 0.04;
const EXP_HIGH_POWER: f64 = 8.0;
const EXP_LINEAR_COEFF: f64 = 0.92;
const EXP_LINEAR_POWER: f64 = 1.05;
const EXP_OFFSET: f64 = 0.04;

/// Fitness errors.
#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    #[error("Weights ({build}, {flaggy}, {exp}) cannot be normalized")]
    DegenerateWeights { build: f64, flaggy: f64, exp: f64 },
    #[error("Weights ({build}, {flaggy}, {exp}) cannot be inverted")]
    SingularWeights { build: f64, flaggy: f64, exp: f64 },
    #[error("Cannot score a layout with no occupied slots")]
    MissingOccupancy,
}

/// Per-objective contributions to a score.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObjectiveScores {
    pub build: f64,
    pub flaggy: f64,
    pub exp: f64,
}

impl ObjectiveScores {
    pub fn total(&self) -> f64 {
        self.build + self.flaggy + self.exp
    }
}

/// Scale weights so they sum to one.
pub fn normalize_weights(weights: Weights) -> Result<Weights, FitnessError> {
    let Weights { build, flaggy, exp } = weights;
    let sum = build + flaggy + exp;
    let valid = [build, flaggy, exp]
        .iter()
        .all(|w| w.is_finite() && *w >= 0.0);

    if !valid || sum <= 0.0 || !sum.is_finite() {
        return Err(FitnessError::DegenerateWeights { build, flaggy, exp });
    }

    Ok(Weights::new(build / sum, flaggy / sum, exp / sum))
}

/// Convert weight ratios into weights calibrated to the raw statistics.
///
/// The result `w` satisfies `w.build * BUILD_SCALE : w.flaggy * FLAGGY_SCALE
/// : w.exp * EXP_SCALE == build : flaggy : exp` and sums to one. It is found
/// by solving the 3x3 system
///
/// ```text
/// flaggy*BUILD_SCALE*w_b - build*FLAGGY_SCALE*w_f                  = 0
///                          exp*FLAGGY_SCALE*w_f - flaggy*EXP_SCALE*w_e = 0
///                      w_b + w_f + w_e                                = 1
/// ```
pub fn invert_weights(weights: Weights) -> Result<Weights, FitnessError> {
    let Weights { build, flaggy, exp } = weights;
    let singular = || FitnessError::SingularWeights { build, flaggy, exp };

    if [build, flaggy, exp]
        .iter()
        .any(|w| *w == 0.0 || !w.is_finite())
    {
        return Err(singular());
    }

    let matrix = [
        [flaggy * BUILD_SCALE, -build * FLAGGY_SCALE, 0.0],
        [0.0, exp * FLAGGY_SCALE, -flaggy * EXP_SCALE],
        [1.0, 1.0, 1.0],
    ];
    let rhs = [0.0, 0.0, 1.0];

    let solution = solve3(&matrix, &rhs).ok_or_else(singular)?;
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(singular());
    }

    Ok(Weights::new(solution[0], solution[1], solution[2]))
}

/// Solve `matrix * x = rhs` by Cramer's rule.
fn solve3(matrix: &[[f64; 3]; 3], rhs: &[f64; 3]) -> Option<[f64; 3]> {
    let det = det3(matrix);
    let scale = matrix
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    if det.abs() <= f64::EPSILON * scale.powi(3) {
        return None;
    }

    let mut x = [0.0; 3];
    for (col, out) in x.iter_mut().enumerate() {
        let mut replaced = *matrix;
        for row in 0..3 {
            replaced[row][col] = rhs[row];
        }
        *out = det3(&replaced) / det;
    }
    Some(x)
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Plain weighted sum of the raw statistics.
pub fn linear_score(array: &CogArray, weights: Weights) -> Result<f64, FitnessError> {
    Ok(linear_breakdown(array, weights)?.total())
}

/// Weighted sum of the curved, occupancy-normalized statistics.
pub fn curved_score(array: &CogArray, weights: Weights) -> Result<f64, FitnessError> {
    Ok(curved_breakdown(array, weights)?.total())
}

/// Per-objective terms of [`linear_score`].
pub fn linear_breakdown(array: &CogArray, weights: Weights) -> Result<ObjectiveScores, FitnessError> {
    if array.num_occupied() == 0 {
        return Err(FitnessError::MissingOccupancy);
    }

    Ok(ObjectiveScores {
        build: weights.build * array.build_rate(),
        flaggy: weights.flaggy * array.flaggy_rate(),
        exp: weights.exp * array.total_exp_mult(),
    })
}

/// Per-objective terms of [`curved_score`].
pub fn curved_breakdown(array: &CogArray, weights: Weights) -> Result<ObjectiveScores, FitnessError> {
    curved_from_totals(
        array.build_rate(),
        array.flaggy_rate(),
        array.total_exp_mult(),
        array.num_occupied(),
        weights,
    )
}

fn curved_from_totals(
    build_rate: f64,
    flaggy_rate: f64,
    exp_mult: f64,
    occupied: usize,
    weights: Weights,
) -> Result<ObjectiveScores, FitnessError> {
    if occupied == 0 {
        return Err(FitnessError::MissingOccupancy);
    }
    let n = occupied as f64;

    Ok(ObjectiveScores {
        build: weights.build * build_response(BUILD_NORMALIZER * build_rate / n),
        flaggy: weights.flaggy * flaggy_response(FLAGGY_NORMALIZER * flaggy_rate / n),
        exp: weights.exp * exp_response(EXP_NORMALIZER * exp_mult / n),
    })
}

fn build_response(x: f64) -> f64 {
    x
}

fn flaggy_response(x: f64) -> f64 {
    (2.0 * x.max(0.0)).powf(FLAGGY_EXPONENT)
}

fn exp_response(x: f64) -> f64 {
    let x = x.max(0.0);
    EXP_HIGH_COEFF * x.powf(EXP_HIGH_POWER) + EXP_LINEAR_COEFF * x.powf(EXP_LINEAR_POWER) + EXP_OFFSET
}

/// Score with a given objective and weights.
pub fn score_with(kind: FitnessKind, array: &CogArray, weights: Weights) -> Result<f64, FitnessError> {
    match kind {
        FitnessKind::AverageAffixConversion => curved_score(array, weights),
        FitnessKind::InversionMatrix => linear_score(array, weights),
    }
}

/// A named per-objective score computed alongside the combined fitness.
///
/// Probes are diagnostic: the engine records them but never selects on them.
pub struct ObjectiveProbe {
    name: String,
    probe: Box<dyn Fn(&CogArray) -> Result<f64, FitnessError> + Send + Sync>,
}

impl ObjectiveProbe {
    pub fn new<F>(name: impl Into<String>, probe: F) -> Self
    where
        F: Fn(&CogArray) -> Result<f64, FitnessError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            probe: Box::new(probe),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluate(&self, array: &CogArray) -> Result<f64, FitnessError> {
        (self.probe)(array)
    }
}

impl fmt::Debug for ObjectiveProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectiveProbe")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Scores layouts with the configured objective and prepared weights.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    kind: FitnessKind,
    weights: Weights,
}

impl FitnessEvaluator {
    /// Prepare weights for the selected objective: normalized for the curved
    /// objective, inverted for the linear one.
    pub fn new(config: &FitnessConfig) -> Result<Self, FitnessError> {
        let weights = match config.function {
            FitnessKind::AverageAffixConversion => normalize_weights(config.weights)?,
            FitnessKind::InversionMatrix => invert_weights(config.weights)?,
        };

        log::debug!(
            "{} weights: build {:.2}%, flaggy {:.2}%, exp {:.2}%",
            config.function.name(),
            weights.build * 100.0,
            weights.flaggy * 100.0,
            weights.exp * 100.0
        );

        Ok(Self {
            kind: config.function,
            weights,
        })
    }

    pub fn kind(&self) -> FitnessKind {
        self.kind
    }

    /// Weights after normalization or inversion.
    pub fn weights(&self) -> Weights {
        self.weights
    }

    /// Combined fitness of a layout.
    pub fn evaluate(&self, array: &CogArray) -> Result<f64, FitnessError> {
        score_with(self.kind, array, self.weights)
    }

    /// Weighted per-objective contributions; they sum to [`Self::evaluate`].
    pub fn breakdown(&self, array: &CogArray) -> Result<ObjectiveScores, FitnessError> {
        match self.kind {
            FitnessKind::AverageAffixConversion => curved_breakdown(array, self.weights),
            FitnessKind::InversionMatrix => linear_breakdown(array, self.weights),
        }
    }

    /// Build-only, flaggy-only and exp-only probes for the same objective.
    pub fn objective_probes(&self) -> Vec<ObjectiveProbe> {
        let kind = self.kind;
        [
            ("build", Weights::new(1.0, 0.0, 0.0)),
            ("flaggy", Weights::new(0.0, 1.0, 0.0)),
            ("exp", Weights::new(0.0, 0.0, 1.0)),
        ]
        .into_iter()
        .map(|(name, unit)| ObjectiveProbe::new(name, move |array| score_with(kind, array, unit)))
        .collect()
    }
}
