//! Input tables, result files, and move planning.
//!
//! Everything here sits at the edge of the search: the engine never touches a
//! file.

mod moves;
mod output;
mod readers;

pub use moves::*;
pub use output::*;
pub use readers::*;
