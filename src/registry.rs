//! Fixed-capacity registry of cluster nodes.
//!
//! Every node ever created (N leaves plus N-1 merges) lives in one `Vec`
//! sized for `2N-1` entries up front. Nodes are addressed by their label,
//! which is also their index, so labels handed out stay valid for the whole
//! run. Merged-away nodes are retired (their slot cleared), never removed.

use serde::Serialize;

use crate::error::{ClusterError, Result};
use crate::store::DistanceStore;

/// One leaf item or one merge event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterNode {
    label: usize,
    children: Option<(usize, usize)>,
    leaf_count: usize,
    #[serde(skip)]
    slot: Option<usize>,
    merge_distance: f32,
    name: Option<String>,
}

impl ClusterNode {
    fn placeholder(label: usize) -> Self {
        Self {
            label,
            children: None,
            leaf_count: 1,
            slot: None,
            merge_distance: 0.0,
            name: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> usize {
        self.label
    }

    /// `(left, right)` child labels, `None` for leaves.
    #[inline]
    #[must_use]
    pub fn children(&self) -> Option<(usize, usize)> {
        self.children
    }

    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Number of leaf items below (and including) this node.
    #[inline]
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Distance store slot while the node is active.
    #[inline]
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }

    /// Distance at which the children merged; `0.0` for leaves.
    #[inline]
    #[must_use]
    pub fn merge_distance(&self) -> f32 {
        self.merge_distance
    }

    /// Item name for leaves.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Nearest active neighbor of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub label: usize,
    pub distance: f32,
}

/// Slots touched by one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Label of the new internal node.
    pub label: usize,
    /// Slot inherited by the new node (the smaller child slot).
    pub kept_slot: usize,
    /// Slot given up by the merge.
    pub freed_slot: usize,
}

/// Node array for one clustering run.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    base: usize,
    nodes: Vec<ClusterNode>,
}

impl NodeRegistry {
    /// Registry for `n` leaves, with room for all `n - 1` merges.
    pub fn new(n: usize) -> Result<Self> {
        if n < 2 {
            return Err(ClusterError::TooFewItems(n));
        }
        let capacity = n
            .checked_mul(2)
            .map(|c| c - 1)
            .ok_or(ClusterError::Allocation {
                what: "node array",
                requested: usize::MAX,
            })?;

        let mut nodes = Vec::new();
        nodes
            .try_reserve_exact(capacity)
            .map_err(|_| ClusterError::Allocation {
                what: "node array",
                requested: capacity,
            })?;
        nodes.extend((0..n).map(ClusterNode::placeholder));

        Ok(Self { base: n, nodes })
    }

    /// Initialize leaf `label` at `slot`.
    ///
    /// Returns `false` without touching anything if the leaf was already
    /// created.
    pub fn create_leaf(&mut self, label: usize, slot: usize, name: &str) -> Result<bool> {
        if label >= self.base || slot >= self.base {
            return Err(ClusterError::LabelOutOfRange {
                label: label.max(slot),
                limit: self.base,
            });
        }
        let leaf = &mut self.nodes[label];
        if leaf.name.is_some() {
            return Ok(false);
        }
        leaf.slot = Some(slot);
        leaf.name = Some(name.to_owned());
        Ok(true)
    }

    /// Append a node merging `left` and `right` at `merge_distance`.
    ///
    /// Both children are retired; the new node takes the smaller slot.
    pub fn create_internal(
        &mut self,
        left: usize,
        right: usize,
        merge_distance: f32,
    ) -> Result<MergeOutcome> {
        if self.nodes.len() == self.capacity() {
            return Err(ClusterError::Invariant(format!(
                "registry full ({} nodes), cannot merge {left} and {right}",
                self.nodes.len()
            )));
        }
        if left == right {
            return Err(ClusterError::Invariant(format!(
                "cannot merge node {left} with itself"
            )));
        }
        let left_slot = self.active_slot(left)?;
        let right_slot = self.active_slot(right)?;
        let (kept_slot, freed_slot) = if left_slot < right_slot {
            (left_slot, right_slot)
        } else {
            (right_slot, left_slot)
        };

        let label = self.nodes.len();
        let leaf_count = self.nodes[left].leaf_count + self.nodes[right].leaf_count;
        self.nodes[left].slot = None;
        self.nodes[right].slot = None;
        self.nodes.push(ClusterNode {
            label,
            children: Some((left, right)),
            leaf_count,
            slot: Some(kept_slot),
            merge_distance,
            name: None,
        });

        Ok(MergeOutcome {
            label,
            kept_slot,
            freed_slot,
        })
    }

    /// Closest active node to `label`.
    ///
    /// Walks the occupied slots of `store`, so the cost follows the number
    /// of live slots rather than the node count. Ties keep the lowest label,
    /// so the result depends on the order in which leaves were labelled.
    /// Returns `None` if `label` is retired or no other node is active.
    #[must_use]
    pub fn find_nearest_active(&self, label: usize, store: &DistanceStore) -> Option<Neighbor> {
        let slot = self.nodes.get(label)?.slot?;
        let mut best: Option<Neighbor> = None;

        for (other, owner) in store.occupied() {
            if other == slot {
                continue;
            }
            let distance = store.get(slot, other);
            let closer = best.map_or(true, |b| {
                distance < b.distance || (distance == b.distance && owner < b.label)
            });
            if closer {
                best = Some(Neighbor {
                    label: owner,
                    distance,
                });
            }
        }

        best
    }

    fn active_slot(&self, label: usize) -> Result<usize> {
        self.nodes
            .get(label)
            .and_then(|n| n.slot)
            .ok_or_else(|| ClusterError::Invariant(format!("node {label} is not active")))
    }

    #[inline]
    #[must_use]
    pub fn node(&self, label: usize) -> Option<&ClusterNode> {
        self.nodes.get(label)
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    /// Nodes created so far (leaves included).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Final node count, `2N-1`.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        2 * self.base - 1
    }

    /// Number of base items `N`.
    #[inline]
    #[must_use]
    pub fn base_count(&self) -> usize {
        self.base
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_active()).count()
    }

    #[must_use]
    pub fn first_active(&self) -> Option<usize> {
        self.nodes.iter().find(|n| n.is_active()).map(|n| n.label)
    }

    /// Whether every leaf has been created.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.nodes[..self.base].iter().all(|n| n.name.is_some())
    }

    /// Whether all merges have happened.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.nodes.len() == self.capacity()
    }
}
