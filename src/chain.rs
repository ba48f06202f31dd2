//! Nearest-neighbor chain merging.
//!
//! **Technical Name**: NN-chain agglomerative clustering
//!
//! Algorithm:
//! - Keep a stack of nodes where each entry is the nearest active neighbor
//!   of the one below it.
//! - Look at the nearest neighbor `nn` of the top. If the top is also a
//!   nearest neighbor of `nn`, the pair is reciprocal: merge it. A tie
//!   counts: when `nn` is exactly as close to its own nearest neighbor as
//!   it is to the top, the top is one of its nearest neighbors.
//! - Otherwise push `nn` and continue from there.
//!
//! Distances strictly decrease up the chain, so it cannot cycle and a
//! reciprocal pair always turns up. With a reducible linkage, merging a
//! reciprocal pair leaves the rest of the chain valid: every remaining entry
//! still has its successor as a nearest neighbor. After a merge the search
//! resumes from the element below the merged pair instead of from scratch.
//!
//! Each chain step costs one O(N) neighbor scan and the chain grows by at
//! most O(N) steps over the whole run, so total work is O(N²) against the
//! O(N³) of re-scanning every active pair after each merge.
//!
//! # References
//!
//! - Benzécri (1982): "Construction d'une classification ascendante hiérarchique
//!   par la recherche en chaîne des voisins réciproques"
//! - Murtagh (1983): "A survey of recent advances in hierarchical clustering algorithms"

use tracing::{debug, trace};

use crate::error::{ClusterError, Result};
use crate::linkage::Linkage;
use crate::registry::{Neighbor, NodeRegistry};
use crate::store::DistanceStore;

/// Counters collected during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainStats {
    pub merges: usize,
    /// Pushes onto the chain, base pushes included.
    pub extensions: usize,
    /// Full nearest-neighbor scans.
    pub nearest_queries: usize,
    /// Longest chain observed.
    pub max_chain_len: usize,
}

/// Nearest-neighbor chain engine.
#[derive(Debug, Clone)]
pub struct NnChain {
    linkage: Linkage,
    chain: Vec<usize>,
    stats: ChainStats,
}

impl NnChain {
    #[must_use]
    pub fn new(linkage: Linkage) -> Self {
        Self {
            linkage,
            chain: Vec::new(),
            stats: ChainStats::default(),
        }
    }

    #[must_use]
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Merge active nodes until only the root is left.
    ///
    /// Every leaf must have been created and own its slot in `store`.
    pub fn run(&mut self, registry: &mut NodeRegistry, store: &mut DistanceStore) -> Result<ChainStats> {
        if !registry.is_complete() {
            return Err(ClusterError::Invariant(
                "clustering started before every leaf was loaded".to_string(),
            ));
        }
        self.chain.clear();
        self.stats = ChainStats::default();

        let base = registry
            .first_active()
            .ok_or_else(|| ClusterError::Invariant("no active node to start from".to_string()))?;
        self.push(base);
        let mut top = base;
        let mut candidate = self.nearest(registry, store, top)?;

        while !registry.is_finished() {
            let next = self.nearest(registry, store, candidate.label)?;

            // `top` is one of the nearest neighbors of `candidate`.
            if next.label == top || next.distance >= candidate.distance {
                self.chain.pop();
                let merged = self.merge(registry, store, top, candidate.label, candidate.distance)?;
                if registry.is_finished() {
                    break;
                }

                if self.chain.is_empty() {
                    self.push(merged);
                }
                if self.chain.len() == 1 {
                    top = self.chain[0];
                    candidate = self.nearest(registry, store, top)?;
                } else {
                    // The entry below the merged pair still points at the
                    // one above it; that distance is untouched by the merge.
                    let below = self.pop()?;
                    top = *self
                        .chain
                        .last()
                        .ok_or_else(|| ClusterError::Invariant("chain emptied".to_string()))?;
                    let distance = store.get(active_slot(registry, top)?, active_slot(registry, below)?);
                    candidate = Neighbor {
                        label: below,
                        distance,
                    };
                }
            } else {
                self.push(candidate.label);
                top = candidate.label;
                candidate = next;
            }
        }

        debug!(
            merges = self.stats.merges,
            extensions = self.stats.extensions,
            nearest_queries = self.stats.nearest_queries,
            max_chain_len = self.stats.max_chain_len,
            "nn-chain finished"
        );
        Ok(self.stats)
    }

    /// Merge `a` and `b`, then rewrite the distances from the kept slot to
    /// every other active slot.
    fn merge(
        &mut self,
        registry: &mut NodeRegistry,
        store: &mut DistanceStore,
        a: usize,
        b: usize,
        distance: f32,
    ) -> Result<usize> {
        let slot_a = active_slot(registry, a)?;
        let slot_b = active_slot(registry, b)?;
        let size_a = registry.nodes()[a].leaf_count();
        let size_b = registry.nodes()[b].leaf_count();

        let outcome = registry.create_internal(a, b, distance)?;

        for slot in 0..store.slots() {
            let Some(owner) = store.owner(slot) else { continue };
            if slot == slot_a || slot == slot_b {
                continue;
            }
            let size_c = registry.nodes()[owner].leaf_count();
            let d_ac = store.get(slot_a, slot);
            let d_bc = store.get(slot_b, slot);
            let updated = self
                .linkage
                .update(size_a, size_b, size_c, d_ac, d_bc, distance);
            store.set(outcome.kept_slot, slot, updated);
        }

        store.release(outcome.freed_slot);
        store.claim(outcome.kept_slot, outcome.label);
        debug_assert!(
            slots_consistent(registry, store),
            "slot ownership diverged after merging {a} and {b}"
        );
        self.stats.merges += 1;

        trace!(
            label = outcome.label,
            left = a,
            right = b,
            distance,
            size = size_a + size_b,
            "merged"
        );
        Ok(outcome.label)
    }

    fn nearest(&mut self, registry: &NodeRegistry, store: &DistanceStore, label: usize) -> Result<Neighbor> {
        self.stats.nearest_queries += 1;
        registry
            .find_nearest_active(label, store)
            .ok_or_else(|| ClusterError::Invariant(format!("node {label} has no active neighbor")))
    }

    fn push(&mut self, label: usize) {
        self.chain.push(label);
        self.stats.extensions += 1;
        self.stats.max_chain_len = self.stats.max_chain_len.max(self.chain.len());
    }

    fn pop(&mut self) -> Result<usize> {
        self.chain
            .pop()
            .ok_or_else(|| ClusterError::Invariant("pop from empty chain".to_string()))
    }
}

fn active_slot(registry: &NodeRegistry, label: usize) -> Result<usize> {
    registry
        .node(label)
        .and_then(|n| n.slot())
        .ok_or_else(|| ClusterError::Invariant(format!("node {label} is retired")))
}

/// Every active node owns a distinct slot in `[0, N)`, and every owned slot
/// points back at an active node.
fn slots_consistent(registry: &NodeRegistry, store: &DistanceStore) -> bool {
    let mut active = 0;
    for node in registry.nodes() {
        let Some(slot) = node.slot() else { continue };
        if slot >= store.slots() || store.owner(slot) != Some(node.label()) {
            return false;
        }
        active += 1;
    }
    active == store.active_slots()
}
