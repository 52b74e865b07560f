//! Compute module - Layout model and evolutionary search.

mod cog_array;

pub mod evolution;

pub use cog_array::*;
