//! Evolutionary search over cog layouts.
//!
//! # Overview
//!
//! The search system consists of:
//!
//! - **Fitness** (`fitness`): weight preparation, the linear and curved
//!   scoring functions, and objective probes
//! - **Operators** (`operators`): random layouts, crossover, and mutation,
//!   all driven by one seeded [`LayoutRng`]
//! - **Controller** (`controller`): validated iteration settings and the
//!   convergence test
//! - **Search** (`search`): the generational loop and restart orchestration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cogstruction::compute::evolution::EvolutionEngine;
//! use cogstruction::schema::{Cog, CogCatalog, SearchConfig, Slot, SlotSet};
//!
//! let catalog = CogCatalog::new(vec![
//!     Cog::new(1, 40.0, 5.0, 0.2),
//!     Cog::new(2, 10.0, 30.0, 0.1),
//! ])?;
//! let slots = SlotSet::new([Slot::new(0, 0), Slot::new(1, 0)])?;
//! let config = SearchConfig::default();
//!
//! let mut engine = EvolutionEngine::new(&config, Arc::new(catalog), Arc::new(slots))?;
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best fitness = {:.3}",
//!         progress.generation, progress.best_fitness);
//! })?;
//!
//! println!("{}", result.best.layout);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod controller;
mod fitness;
mod operators;
mod search;

pub use controller::IterationController;
pub use fitness::{
    BUILD_SCALE, EXP_SCALE, FLAGGY_SCALE, FitnessError, FitnessEvaluator, ObjectiveProbe,
    ObjectiveScores, curved_breakdown, curved_score, invert_weights, linear_breakdown,
    linear_score, normalize_weights, score_with,
};
pub use operators::LayoutRng;
pub use search::{
    BestRecord, Candidate, EvolutionEngine, EvolutionResult, Generation, RestartSummary,
    SearchError,
};
