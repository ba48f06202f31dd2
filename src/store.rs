//! Condensed triangular distance storage with a fixed slot arena.
//!
//! The full symmetric `N x N` matrix is never materialized. Only the strict
//! lower triangle is kept, as a flat `Vec<f32>` of `N(N-1)/2` entries:
//!
//! ```text
//! slot:     0   1   2   3
//!       0   -
//!       1   0   -
//!       2   1   2   -
//!       3   3   4   5   -
//!
//! index_of(a, b) = max·(max-1)/2 + min
//! ```
//!
//! Rows and columns are addressed by *slot*, not by node label. There are
//! exactly `N` slots and they are never created after construction: when two
//! active clusters merge, the merged cluster keeps the smaller of the two
//! slots and the other is released for good. The number of occupied slots
//! therefore always equals the number of active clusters, and the store is
//! never resized.

use crate::error::{ClusterError, Result};

/// Reserve exactly `len` elements or report which structure failed.
pub(crate) fn try_alloc<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ClusterError::Allocation {
            what,
            requested: len,
        })?;
    buf.resize(len, value);
    Ok(buf)
}

/// Number of unordered distinct pairs over `n` items, `None` on overflow.
#[inline]
#[must_use]
pub fn pair_count(n: usize) -> Option<usize> {
    if n < 2 {
        return Some(0);
    }
    n.checked_mul(n - 1).map(|p| p / 2)
}

/// Flat storage for a symmetric distance relation over slot indices.
#[derive(Debug, Clone)]
pub struct DistanceStore {
    slots: usize,
    distances: Vec<f32>,
    /// Label of the active node occupying each slot.
    owners: Vec<Option<usize>>,
}

impl DistanceStore {
    /// Allocate a zeroed store for `n` slots.
    pub fn new(n: usize) -> Result<Self> {
        if n < 2 {
            return Err(ClusterError::TooFewItems(n));
        }
        let len = pair_count(n).ok_or(ClusterError::Allocation {
            what: "distance store",
            requested: usize::MAX,
        })?;

        Ok(Self {
            slots: n,
            distances: try_alloc("distance store", len, 0.0f32)?,
            owners: try_alloc("slot arena", n, None)?,
        })
    }

    /// Build a store whose distance between slots `a` and `b` is `f(a, b)`.
    ///
    /// `f` is called once per unordered pair with `a < b`. Slots are left
    /// unclaimed.
    pub fn from_fn<F>(n: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut store = Self::new(n)?;
        for b in 1..n {
            for a in 0..b {
                let d = f(a, b);
                store.set(a, b, d);
            }
        }
        Ok(store)
    }

    /// Number of slots (the base item count `N`).
    #[inline]
    #[must_use]
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Number of stored distances, `N(N-1)/2`.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Offset of the unordered pair `{a, b}` in the flat array.
    ///
    /// # Panics
    ///
    /// Panics if `a == b` or either slot is out of range.
    #[inline]
    #[must_use]
    pub fn index_of(&self, a: usize, b: usize) -> usize {
        assert_ne!(a, b, "distance between slot {a} and itself is undefined");
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        assert!(hi < self.slots, "slot {hi} out of range for {} slots", self.slots);
        hi * (hi - 1) / 2 + lo
    }

    #[inline]
    #[must_use]
    pub fn get(&self, a: usize, b: usize) -> f32 {
        self.distances[self.index_of(a, b)]
    }

    #[inline]
    pub fn set(&mut self, a: usize, b: usize, distance: f32) {
        let idx = self.index_of(a, b);
        self.distances[idx] = distance;
    }

    /// Hand `slot` to the active node `label`.
    pub fn claim(&mut self, slot: usize, label: usize) {
        self.owners[slot] = Some(label);
    }

    /// Release `slot`, returning its previous owner.
    pub fn release(&mut self, slot: usize) -> Option<usize> {
        self.owners[slot].take()
    }

    #[inline]
    #[must_use]
    pub fn owner(&self, slot: usize) -> Option<usize> {
        self.owners[slot]
    }

    /// Occupied slots as `(slot, owner_label)`, in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(slot, owner)| owner.map(|label| (slot, label)))
    }

    #[must_use]
    pub fn active_slots(&self) -> usize {
        self.owners.iter().filter(|o| o.is_some()).count()
    }
}
