use rand::seq::index;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// A candidate bounding box inside a panel, in normalized coordinates
/// (`cx`/`cy` are the center, `w`/`h` the maximum extent an entity may fill).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotBox {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl SlotBox {
    pub const fn new(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self { cx, cy, w, h }
    }
}

/// Bounded retry count for replacement-subset draws. Exhausting it falls back
/// to the last draw (best effort, not a hard guarantee).
pub const SUBSET_RETRY_LIMIT: usize = 50;

/// The positional attribute of a layout: a fixed catalog of candidate slots
/// plus the subset currently occupied, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionAttr {
    catalog: Vec<SlotBox>,
    active: Vec<usize>,
}

impl PositionAttr {
    pub fn new(catalog: Vec<SlotBox>) -> Self {
        debug_assert!(!catalog.is_empty());
        Self {
            catalog,
            active: Vec::new(),
        }
    }

    #[inline]
    pub fn catalog(&self) -> &[SlotBox] {
        &self.catalog
    }

    #[inline]
    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    #[inline]
    pub fn active(&self) -> &[usize] {
        &self.active
    }

    pub fn set_active(&mut self, active: Vec<usize>) {
        debug_assert!(active.iter().all(|&i| i < self.catalog.len()));
        self.active = active;
    }

    /// The active subset as a set (insertion order discarded).
    pub fn active_set(&self) -> FxHashSet<usize> {
        self.active.iter().copied().collect()
    }

    /// Bounding boxes of the active slots, in active order.
    pub fn boxes(&self) -> Vec<SlotBox> {
        self.active.iter().map(|&i| self.catalog[i]).collect()
    }

    /// Draw a fresh active subset of size `n` (clamped to the catalog size).
    pub fn sample(&mut self, rng: &mut impl Rng, n: usize) {
        let n = n.min(self.catalog.len());
        self.active = index::sample(rng, self.catalog.len(), n).into_vec();
    }

    /// Draw a subset of size `n` that differs, as a set, from the current
    /// subset and from every set in `excluded`. Retries up to
    /// [`SUBSET_RETRY_LIMIT`] times and then returns the last draw.
    pub fn sample_distinct(
        &self,
        rng: &mut impl Rng,
        n: usize,
        excluded: &[FxHashSet<usize>],
    ) -> Vec<usize> {
        let n = n.min(self.catalog.len());
        let current = self.active_set();
        let mut draw = Vec::new();
        for _ in 0..SUBSET_RETRY_LIMIT {
            draw = index::sample(rng, self.catalog.len(), n).into_vec();
            let set: FxHashSet<usize> = draw.iter().copied().collect();
            if set != current && excluded.iter().all(|e| *e != set) {
                return draw;
            }
        }
        draw
    }

    /// Occupy up to `n` currently free slots, returning the chosen indices
    /// and their boxes. New indices are prepended, matching the convention
    /// that freshly added entities come first.
    pub fn fill_free(&mut self, rng: &mut impl Rng, n: usize) -> Vec<(usize, SlotBox)> {
        let free: Vec<usize> = (0..self.catalog.len())
            .filter(|i| !self.active.contains(i))
            .collect();
        let take = n.min(free.len());
        let mut out = Vec::with_capacity(take);
        for pick in index::sample(rng, free.len(), take).into_iter() {
            let idx = free[pick];
            self.active.insert(0, idx);
            out.push((idx, self.catalog[idx]));
        }
        out
    }

    /// Cyclically shift every active index by `d` modulo the catalog size,
    /// preserving the order-to-index correspondence.
    pub fn shift(&mut self, d: i32) {
        let m = self.catalog.len() as i32;
        for idx in &mut self.active {
            *idx = (*idx as i32 + d).rem_euclid(m) as usize;
        }
    }

    /// Release the slot whose catalog box equals `bbox`. Returns false when
    /// no active slot carries that box.
    pub fn remove_box(&mut self, bbox: SlotBox) -> bool {
        if let Some(pos) = self.active.iter().position(|&i| self.catalog[i] == bbox) {
            self.active.remove(pos);
            true
        } else {
            false
        }
    }
}
