//! Layout generation, crossover and mutation.

use std::sync::Arc;

use rand::prelude::*;

use crate::compute::{CogArray, LayoutError};
use crate::schema::{CogCatalog, SlotSet};

/// Random number generator wrapper for layout operations.
///
/// One instance drives initialization and every operator of a run, so a
/// fixed seed reproduces the whole search.
pub struct LayoutRng {
    rng: StdRng,
    seed: Option<u64>,
}

impl LayoutRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Wrap an existing generator. Its seed is unknown.
    pub fn from_rng(rng: StdRng) -> Self {
        Self { rng, seed: None }
    }

    /// Seed this generator was created from, if known.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.r#gen::<f64>() < p
    }

    /// Uniform value in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen()
    }

    /// Distribute cogs over slots at random.
    ///
    /// Places `min(cogs, slots)` cogs; the remainder stays spare.
    pub fn random_layout(
        &mut self,
        catalog: &Arc<CogCatalog>,
        slots: &Arc<SlotSet>,
    ) -> Result<CogArray, LayoutError> {
        let mut cogs: Vec<usize> = (0..catalog.len()).collect();
        let mut targets: Vec<usize> = (0..slots.len()).collect();
        cogs.shuffle(&mut self.rng);
        targets.shuffle(&mut self.rng);

        let mut array = CogArray::empty(Arc::clone(catalog), Arc::clone(slots));
        for (&slot_idx, &cog_idx) in targets.iter().zip(&cogs) {
            array.place_at(slot_idx, cog_idx)?;
        }
        Ok(array)
    }

    /// One-point crossover over slot order.
    ///
    /// With `probability`, recombines the parents at a random cut in
    /// `1..slots` (see [`crossover_at`]). Otherwise returns a clone of
    /// `parent_a`.
    pub fn crossover(
        &mut self,
        parent_a: &CogArray,
        parent_b: &CogArray,
        probability: f64,
    ) -> Result<CogArray, LayoutError> {
        if !self.chance(probability) {
            return Ok(parent_a.clone());
        }

        let num_slots = parent_a.slots().len();
        let cut = if num_slots > 1 {
            self.rng.gen_range(1..num_slots)
        } else {
            num_slots
        };
        crossover_at(parent_a, parent_b, cut)
    }

    /// Replace the content of one random slot with a random spare cog.
    ///
    /// With no spare cogs this degrades to a two-point swap.
    pub fn mutate_one_point(&mut self, array: &mut CogArray) -> Result<(), LayoutError> {
        if array.num_spare() == 0 {
            self.mutate_two_point(array);
            return Ok(());
        }

        let slot_idx = self.index(array.slots().len());
        let incoming = array.spare_positions()[self.index(array.num_spare())];

        if array.occupant(slot_idx).is_some() {
            array.remove_at(slot_idx)?;
        }
        array.place_at(slot_idx, incoming)
    }

    /// Swap the contents of two distinct random slots.
    pub fn mutate_two_point(&mut self, array: &mut CogArray) {
        let num_slots = array.slots().len();
        if num_slots < 2 {
            return;
        }

        let a = self.index(num_slots);
        let mut b = self.index(num_slots - 1);
        if b >= a {
            b += 1;
        }
        array.swap_slots(a, b);
    }
}

/// Recombine two parents at slot position `cut`.
///
/// Slots before `cut` take `parent_a`'s cog and the rest take `parent_b`'s.
/// `parent_a`'s segment is placed first and is never displaced; a `parent_b`
/// cog already used by the child falls back to `parent_a`'s cog for that
/// slot, else the slot stays empty. Empty slots are then filled with unused
/// cogs from `parent_a` and then `parent_b`, in slot order.
pub(crate) fn crossover_at(
    parent_a: &CogArray,
    parent_b: &CogArray,
    cut: usize,
) -> Result<CogArray, LayoutError> {
    let num_slots = parent_a.slots().len();
    let mut child = CogArray::empty(Arc::clone(parent_a.catalog()), Arc::clone(parent_a.slots()));

    for slot_idx in 0..num_slots {
        let (primary, secondary) = if slot_idx < cut {
            (parent_a, parent_b)
        } else {
            (parent_b, parent_a)
        };
        let pick = [primary.occupant(slot_idx), secondary.occupant(slot_idx)]
            .into_iter()
            .flatten()
            .find(|&c| !child.is_placed(c));
        if let Some(cog_idx) = pick {
            child.place_at(slot_idx, cog_idx)?;
        }
    }

    let mut leftovers = (0..num_slots)
        .filter_map(|s| parent_a.occupant(s))
        .chain((0..num_slots).filter_map(|s| parent_b.occupant(s)));
    for slot_idx in 0..num_slots {
        if child.occupant(slot_idx).is_some() {
            continue;
        }
        let next = leftovers.find(|&c| !child.is_placed(c));
        match next {
            Some(cog_idx) => child.place_at(slot_idx, cog_idx)?,
            None => break,
        }
    }

    Ok(child)
}
