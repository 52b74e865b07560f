//! Reconcile a new layout against the previous one.
//!
//! Cogs are matched by their attributes rather than their ids, so a
//! renumbered cog table still finds the cog where it was.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::io;

use serde::Serialize;

use crate::compute::{CogArray, LayoutRow};
use crate::schema::{Cog, CogId, Slot};

/// Header of the move table.
pub const MOVES_HEADER: [&str; 4] = ["cog", "to_x", "to_y", "from"];

/// Where a cog has to be picked up from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A slot of the previous layout.
    Slot(Slot),
    /// Not placed in the previous layout.
    Shelf,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Slot(slot) => write!(f, "{}", slot),
            Origin::Shelf => write!(f, "shelf"),
        }
    }
}

/// One placement instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub cog: CogId,
    pub to: Slot,
    pub from: Origin,
}

impl Move {
    /// Whether the cog is already where it needs to be.
    pub fn is_stationary(&self) -> bool {
        self.from == Origin::Slot(self.to)
    }
}

#[derive(Serialize)]
struct MoveRow {
    cog: CogId,
    to_x: u32,
    to_y: u32,
    from: String,
}

/// Bit-exact attribute identity of a cog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct AttributeKey {
    build_rate: u64,
    flaggy_rate: u64,
    exp_mult: u64,
    affix: Option<String>,
}

impl AttributeKey {
    fn new(build_rate: f64, flaggy_rate: f64, exp_mult: f64, affix: Option<&str>) -> Self {
        Self {
            build_rate: build_rate.to_bits(),
            flaggy_rate: flaggy_rate.to_bits(),
            exp_mult: exp_mult.to_bits(),
            affix: affix.map(str::to_string),
        }
    }

    fn of_cog(cog: &Cog) -> Self {
        Self::new(cog.build_rate, cog.flaggy_rate, cog.exp_mult, cog.affix.as_deref())
    }

    fn of_row(row: &LayoutRow) -> Self {
        Self::new(row.build_rate, row.flaggy_rate, row.exp_mult, row.affix.as_deref())
    }
}

/// Plan the moves from `prior` to `next`.
///
/// New placements are visited in slot order. Each takes the first unclaimed
/// prior position holding a cog with identical attributes, or the shelf when
/// none is left.
pub fn plan_moves(prior: &[LayoutRow], next: &CogArray) -> Vec<Move> {
    let mut positions: BTreeMap<AttributeKey, VecDeque<Slot>> = BTreeMap::new();
    for row in prior {
        positions
            .entry(AttributeKey::of_row(row))
            .or_default()
            .push_back(row.slot());
    }

    next.placements()
        .map(|(to, cog)| {
            let from = positions
                .get_mut(&AttributeKey::of_cog(cog))
                .and_then(VecDeque::pop_front)
                .map_or(Origin::Shelf, Origin::Slot);
            Move {
                cog: cog.id,
                to,
                from,
            }
        })
        .collect()
}

/// Write the move table.
pub fn write_moves<W: io::Write>(moves: &[Move], writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(MOVES_HEADER)?;
    for mv in moves {
        writer.serialize(MoveRow {
            cog: mv.cog,
            to_x: mv.to.x,
            to_y: mv.to.y,
            from: mv.from.to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}
