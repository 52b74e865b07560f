//! Schema module - Data model and configuration types for cog array searches.

mod cog;
mod config;
mod evolution;
mod slot;

pub use cog::*;
pub use config::*;
pub use evolution::*;
pub use slot::*;
