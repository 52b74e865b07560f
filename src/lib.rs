//! Cogstruction - Evolutionary search for cog array layouts.
//!
//! This crate places a collection of cogs, each contributing to a build rate,
//! a flaggy rate and an experience multiplier, into a fixed set of grid slots
//! so that a weighted, non-linear combination of the three totals is as high
//! as possible.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Cogs, slots and configuration types
//! - `compute`: The cog array layout and the evolutionary search
//! - `io`: Input tables, result files and move planning
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use cogstruction::{
//!     compute::evolution::EvolutionEngine,
//!     io::{InputTables, plan_moves, read_prior_layout, write_layout_record},
//!     schema::SearchConfig,
//! };
//!
//! let dir = Path::new(".");
//! let tables = InputTables::load(dir)?;
//! let config = SearchConfig {
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let mut engine =
//!     EvolutionEngine::new(&config, Arc::new(tables.catalog), Arc::new(tables.slots))?;
//! let result = engine.run()?;
//! println!("{}", result.best.layout);
//!
//! let prior = read_prior_layout(dir)?.unwrap_or_default();
//! let moves = plan_moves(&prior, &result.best.layout);
//! println!("{} moves", moves.len());
//! write_layout_record(dir, &result.best.layout)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod io;
pub mod schema;

// Re-export commonly used types
pub use compute::CogArray;
pub use compute::evolution::{EvolutionEngine, EvolutionResult};
pub use schema::{Cog, CogCatalog, SearchConfig, Slot, SlotSet};
