//! Grid slots and the set of slots eligible for placement.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::CatalogError;

/// A grid coordinate.
///
/// Ordering is row-major: by `y`, then by `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub x: u32,
    pub y: u32,
}

impl Slot {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// The slots a cog may be placed in, in row-major order.
#[derive(Debug, Clone)]
pub struct SlotSet {
    slots: Vec<Slot>,
    index: BTreeMap<Slot, usize>,
}

impl SlotSet {
    /// Build a slot set. Duplicate coordinates are collapsed.
    pub fn new(slots: impl IntoIterator<Item = Slot>) -> Result<Self, CatalogError> {
        let unique: BTreeSet<Slot> = slots.into_iter().collect();
        if unique.is_empty() {
            return Err(CatalogError::EmptySlotSet);
        }

        let slots: Vec<Slot> = unique.into_iter().collect();
        let index = slots.iter().enumerate().map(|(i, s)| (*s, i)).collect();
        Ok(Self { slots, index })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.index.contains_key(&slot)
    }

    /// Position of a slot in row-major order.
    pub fn position(&self, slot: Slot) -> Option<usize> {
        self.index.get(&slot).copied()
    }

    /// Slot at a position.
    pub fn get(&self, idx: usize) -> Option<Slot> {
        self.slots.get(idx).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        self.slots.iter().copied()
    }

    /// Distinct `x` coordinates in ascending order.
    pub fn columns(&self) -> Vec<u32> {
        let xs: BTreeSet<u32> = self.slots.iter().map(|s| s.x).collect();
        xs.into_iter().collect()
    }

    /// Distinct `y` coordinates in ascending order.
    pub fn rows(&self) -> Vec<u32> {
        let mut ys: Vec<u32> = self.slots.iter().map(|s| s.y).collect();
        ys.dedup();
        ys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_set_row_major_and_dedup() {
        let set = SlotSet::new(vec![
            Slot::new(2, 1),
            Slot::new(0, 1),
            Slot::new(5, 0),
            Slot::new(0, 1),
        ])
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.get(0), Some(Slot::new(5, 0)));
        assert_eq!(set.position(Slot::new(2, 1)), Some(2));
        assert!(!set.contains(Slot::new(1, 1)));
        assert_eq!(set.columns(), vec![0, 2, 5]);
        assert_eq!(set.rows(), vec![0, 1]);
    }

    #[test]
    fn test_empty_slot_set_rejected() {
        assert!(matches!(
            SlotSet::new(Vec::new()),
            Err(CatalogError::EmptySlotSet)
        ));
    }
}
