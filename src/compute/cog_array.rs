//! Candidate layouts: assignments of catalog cogs to eligible slots.

use std::fmt;
use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::{Cog, CogCatalog, CogId, Slot, SlotSet};

/// Errors raised when a layout is modified illegally or cannot be read back.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Cannot place cog {cog} at {slot}: {reason}")]
    InvalidPlacement {
        slot: Slot,
        cog: CogId,
        reason: &'static str,
    },
    #[error("Cannot remove from {0}: slot is empty")]
    InvalidRemoval(Slot),
    #[error("Slot position {0} is out of range")]
    SlotOutOfRange(usize),
    #[error("Cog position {0} is out of range")]
    CogOutOfRange(usize),
    #[error("Cog {0} is not in the catalog")]
    UnknownCog(CogId),
    #[error("Layout record error: {0}")]
    Record(#[from] csv::Error),
    #[error("Layout record is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Column names of the canonical layout record.
pub const LAYOUT_HEADER: [&str; 7] = [
    "cog",
    "x",
    "y",
    "build_rate",
    "flaggy_rate",
    "exp_mult",
    "affix",
];

/// One row of the canonical layout record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRow {
    pub cog: CogId,
    pub x: u32,
    pub y: u32,
    pub build_rate: f64,
    pub flaggy_rate: f64,
    pub exp_mult: f64,
    pub affix: Option<String>,
}

impl LayoutRow {
    fn new(slot: Slot, cog: &Cog) -> Self {
        Self {
            cog: cog.id,
            x: slot.x,
            y: slot.y,
            build_rate: cog.build_rate,
            flaggy_rate: cog.flaggy_rate,
            exp_mult: cog.exp_mult,
            affix: cog.affix.clone(),
        }
    }

    pub fn slot(&self) -> Slot {
        Slot::new(self.x, self.y)
    }
}

/// Fixed-point scale of the running totals, 2^64.
const FIXED_SCALE: f64 = 18_446_744_073_709_551_616.0;

/// Running sum of one cog attribute.
///
/// Each value is converted to a 64.64 fixed-point integer before it is
/// added, so the total is exact and does not depend on placement order or
/// on the history of the layout. Catalog attributes are bounded by
/// [`crate::schema::MAX_ATTRIBUTE`], which keeps the sum far from overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FixedTotal(i128);

impl FixedTotal {
    fn units(value: f64) -> i128 {
        (value * FIXED_SCALE) as i128
    }

    fn add(&mut self, value: f64) {
        self.0 += Self::units(value);
    }

    fn sub(&mut self, value: f64) {
        self.0 -= Self::units(value);
    }

    fn value(self) -> f64 {
        self.0 as f64 / FIXED_SCALE
    }
}

/// A candidate layout.
///
/// Every catalog cog is either placed in exactly one slot or held in the
/// spare pool. Aggregate statistics are maintained incrementally.
#[derive(Debug, Clone)]
pub struct CogArray {
    catalog: Arc<CogCatalog>,
    slots: Arc<SlotSet>,
    /// Catalog position of the cog in each slot, by slot position.
    assignment: Vec<Option<usize>>,
    /// Slot position of each cog, by catalog position.
    location: Vec<Option<usize>>,
    /// Catalog positions of unplaced cogs.
    spare: Vec<usize>,
    build_rate: FixedTotal,
    flaggy_rate: FixedTotal,
    total_exp_mult: FixedTotal,
    num_occupied: usize,
}

impl CogArray {
    /// An empty layout with every cog spare.
    pub fn empty(catalog: Arc<CogCatalog>, slots: Arc<SlotSet>) -> Self {
        let assignment = vec![None; slots.len()];
        let location = vec![None; catalog.len()];
        let spare = (0..catalog.len()).collect();

        Self {
            catalog,
            slots,
            assignment,
            location,
            spare,
            build_rate: FixedTotal::default(),
            flaggy_rate: FixedTotal::default(),
            total_exp_mult: FixedTotal::default(),
            num_occupied: 0,
        }
    }

    /// A layout with the given placements applied in order.
    pub fn from_placements(
        catalog: Arc<CogCatalog>,
        slots: Arc<SlotSet>,
        placements: &[(Slot, CogId)],
    ) -> Result<Self, LayoutError> {
        let mut array = Self::empty(catalog, slots);
        for &(slot, cog) in placements {
            array.place(slot, cog)?;
        }
        Ok(array)
    }

    /// Rebuild a layout from its canonical record.
    ///
    /// Rows are resolved by cog id against `catalog`; the attribute columns
    /// are informational.
    pub fn from_record<R: io::Read>(
        reader: R,
        catalog: Arc<CogCatalog>,
        slots: Arc<SlotSet>,
    ) -> Result<Self, LayoutError> {
        let rows = read_rows(reader)?;
        let placements: Vec<(Slot, CogId)> = rows.iter().map(|r| (r.slot(), r.cog)).collect();
        Self::from_placements(catalog, slots, &placements)
    }

    pub fn build_rate(&self) -> f64 {
        self.build_rate.value()
    }

    pub fn flaggy_rate(&self) -> f64 {
        self.flaggy_rate.value()
    }

    pub fn total_exp_mult(&self) -> f64 {
        self.total_exp_mult.value()
    }

    pub fn num_occupied(&self) -> usize {
        self.num_occupied
    }

    pub fn num_spare(&self) -> usize {
        self.spare.len()
    }

    pub fn catalog(&self) -> &Arc<CogCatalog> {
        &self.catalog
    }

    pub fn slots(&self) -> &Arc<SlotSet> {
        &self.slots
    }

    /// Place a spare cog into an empty eligible slot.
    pub fn place(&mut self, slot: Slot, cog: CogId) -> Result<(), LayoutError> {
        let cog_idx = self
            .catalog
            .position(cog)
            .ok_or(LayoutError::UnknownCog(cog))?;
        let slot_idx = self
            .slots
            .position(slot)
            .ok_or(LayoutError::InvalidPlacement {
                slot,
                cog,
                reason: "slot is not eligible",
            })?;
        self.place_at(slot_idx, cog_idx)
    }

    /// Empty an occupied slot, returning its cog to the spare pool.
    pub fn remove(&mut self, slot: Slot) -> Result<CogId, LayoutError> {
        let slot_idx = self
            .slots
            .position(slot)
            .ok_or(LayoutError::InvalidRemoval(slot))?;
        let cog_idx = self.remove_at(slot_idx)?;
        Ok(self.catalog[cog_idx].id)
    }

    /// Cog occupying `slot`, if any.
    pub fn cog_at(&self, slot: Slot) -> Option<&Cog> {
        let slot_idx = self.slots.position(slot)?;
        self.assignment[slot_idx].map(|c| &self.catalog[c])
    }

    /// Occupied slots and their cogs, in slot order.
    pub fn placements(&self) -> impl Iterator<Item = (Slot, &Cog)> + '_ {
        self.slots
            .iter()
            .zip(&self.assignment)
            .filter_map(|(slot, c)| c.map(|c| (slot, &self.catalog[c])))
    }

    /// Unplaced cogs.
    pub fn spare(&self) -> impl Iterator<Item = &Cog> + '_ {
        self.spare.iter().map(|&c| &self.catalog[c])
    }

    /// Canonical record rows, in slot order.
    pub fn rows(&self) -> Vec<LayoutRow> {
        self.placements()
            .map(|(slot, cog)| LayoutRow::new(slot, cog))
            .collect()
    }

    /// Write the canonical record: a header plus one row per occupied slot.
    pub fn write_record<W: io::Write>(&self, writer: W) -> Result<(), LayoutError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        writer.write_record(LAYOUT_HEADER)?;
        for row in self.rows() {
            writer.serialize(row)?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Canonical record as a string.
    pub fn serialize(&self) -> Result<String, LayoutError> {
        let mut buf = Vec::new();
        self.write_record(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    // ------------------------------------------------------------------
    // Position-based primitives used by the genetic operators.
    // ------------------------------------------------------------------

    /// Catalog position of the cog in a slot position.
    pub(crate) fn occupant(&self, slot_idx: usize) -> Option<usize> {
        self.assignment.get(slot_idx).copied().flatten()
    }

    /// Whether the cog at a catalog position is placed.
    pub(crate) fn is_placed(&self, cog_idx: usize) -> bool {
        self.location.get(cog_idx).copied().flatten().is_some()
    }

    pub(crate) fn spare_positions(&self) -> &[usize] {
        &self.spare
    }

    pub(crate) fn place_at(&mut self, slot_idx: usize, cog_idx: usize) -> Result<(), LayoutError> {
        let slot = self
            .slots
            .get(slot_idx)
            .ok_or(LayoutError::SlotOutOfRange(slot_idx))?;
        let cog = self
            .catalog
            .get(cog_idx)
            .map(|c| c.id)
            .ok_or(LayoutError::CogOutOfRange(cog_idx))?;

        if let Some(current) = self.assignment[slot_idx] {
            return Err(LayoutError::InvalidPlacement {
                slot,
                cog,
                reason: if current == cog_idx {
                    "cog is already there"
                } else {
                    "slot is occupied"
                },
            });
        }

        let spare_pos = self
            .spare
            .iter()
            .position(|&c| c == cog_idx)
            .ok_or(LayoutError::InvalidPlacement {
                slot,
                cog,
                reason: "cog is already placed",
            })?;
        self.spare.swap_remove(spare_pos);

        self.assignment[slot_idx] = Some(cog_idx);
        self.location[cog_idx] = Some(slot_idx);

        let cog = &self.catalog[cog_idx];
        self.build_rate.add(cog.build_rate);
        self.flaggy_rate.add(cog.flaggy_rate);
        self.total_exp_mult.add(cog.exp_mult);
        self.num_occupied += 1;
        Ok(())
    }

    pub(crate) fn remove_at(&mut self, slot_idx: usize) -> Result<usize, LayoutError> {
        let slot = self
            .slots
            .get(slot_idx)
            .ok_or(LayoutError::SlotOutOfRange(slot_idx))?;
        let cog_idx = self.assignment[slot_idx]
            .take()
            .ok_or(LayoutError::InvalidRemoval(slot))?;

        self.location[cog_idx] = None;
        self.spare.push(cog_idx);

        let cog = &self.catalog[cog_idx];
        self.build_rate.sub(cog.build_rate);
        self.flaggy_rate.sub(cog.flaggy_rate);
        self.total_exp_mult.sub(cog.exp_mult);
        self.num_occupied -= 1;
        Ok(cog_idx)
    }

    /// Exchange the contents of two slot positions. Aggregates are unchanged.
    pub(crate) fn swap_slots(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.assignment.swap(a, b);
        if let Some(c) = self.assignment[a] {
            self.location[c] = Some(a);
        }
        if let Some(c) = self.assignment[b] {
            self.location[c] = Some(b);
        }
    }

    /// Recompute aggregates from scratch. Only used to check the cache.
    #[cfg(test)]
    pub(crate) fn recomputed_totals(&self) -> (f64, f64, f64, usize) {
        self.placements().fold((0.0, 0.0, 0.0, 0), |acc, (_, cog)| {
            (
                acc.0 + cog.build_rate,
                acc.1 + cog.flaggy_rate,
                acc.2 + cog.exp_mult,
                acc.3 + 1,
            )
        })
    }
}

/// Read canonical record rows.
pub fn read_rows<R: io::Read>(reader: R) -> Result<Vec<LayoutRow>, LayoutError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: LayoutRow = result?;
        rows.push(row);
    }
    Ok(rows)
}

impl fmt::Display for CogArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only coordinates that occur in the slot set get a row or column.
        let columns = self.slots.columns();
        let width = self
            .catalog
            .iter()
            .map(|c| c.id.to_string().len())
            .max()
            .unwrap_or(1);

        for y in self.slots.rows() {
            let mut line = String::new();
            for &x in &columns {
                let slot = Slot::new(x, y);
                let cell = if !self.slots.contains(slot) {
                    String::new()
                } else {
                    match self.cog_at(slot) {
                        Some(cog) => cog.id.to_string(),
                        None => ".".to_string(),
                    }
                };
                line.push_str(&format!(" {:>width$}", cell, width = width));
            }
            writeln!(f, "{}", line.trim_end())?;
        }

        writeln!(f)?;
        writeln!(f, "Build rate: {:.3}", self.build_rate())?;
        writeln!(f, "Flaggy rate: {:.3}", self.flaggy_rate())?;
        writeln!(f, "Exp multiplier: {:.3}", self.total_exp_mult())?;
        write!(
            f,
            "Occupied: {}/{} ({} spare)",
            self.num_occupied,
            self.slots.len(),
            self.spare.len()
        )
    }
}
