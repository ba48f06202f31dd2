//! The finished merge tree.

use std::collections::VecDeque;

use serde::Serialize;

use crate::error::{ClusterError, Result};
use crate::ingest::NameIndex;
use crate::linkage::Linkage;
use crate::registry::{ClusterNode, NodeRegistry};

/// One merge event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Merge {
    pub label: usize,
    pub left: usize,
    pub right: usize,
    pub distance: f32,
    /// Leaf count of the merged cluster.
    pub size: usize,
}

/// Complete dendrogram over `N` items: `N` leaves and `N-1` merges.
///
/// Labels `0..N` are leaves, `N..2N-1` merges in the order they happened;
/// the root is `2N-2`.
#[derive(Debug, Clone)]
pub struct Dendrogram {
    registry: NodeRegistry,
    names: NameIndex,
    linkage: Linkage,
}

impl Dendrogram {
    pub(crate) fn new(registry: NodeRegistry, names: NameIndex, linkage: Linkage) -> Result<Self> {
        if !registry.is_finished() {
            return Err(ClusterError::Invariant(format!(
                "dendrogram needs {} nodes, registry holds {}",
                registry.capacity(),
                registry.len()
            )));
        }
        Ok(Self {
            registry,
            names,
            linkage,
        })
    }

    #[must_use]
    pub fn root(&self) -> &ClusterNode {
        &self.registry.nodes()[self.registry.len() - 1]
    }

    #[must_use]
    pub fn node(&self, label: usize) -> Option<&ClusterNode> {
        self.registry.node(label)
    }

    /// All nodes in label order.
    #[must_use]
    pub fn nodes(&self) -> &[ClusterNode] {
        self.registry.nodes()
    }

    /// Total node count, `2N-1`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    #[must_use]
    pub fn base_count(&self) -> usize {
        self.registry.base_count()
    }

    #[must_use]
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    #[must_use]
    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    #[must_use]
    pub fn label_of(&self, name: &str) -> Option<usize> {
        self.names.label_of(name)
    }

    /// Merge events in the order they happened.
    pub fn merges(&self) -> impl Iterator<Item = Merge> + '_ {
        self.registry.nodes()[self.base_count()..]
            .iter()
            .filter_map(|node| {
                let (left, right) = node.children()?;
                Some(Merge {
                    label: node.label(),
                    left,
                    right,
                    distance: node.merge_distance(),
                    size: node.leaf_count(),
                })
            })
    }

    /// Leaf labels below `label`, breadth first. A leaf yields itself.
    #[must_use]
    pub fn leaves_under(&self, label: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut queue = VecDeque::from([label]);
        while let Some(current) = queue.pop_front() {
            let Some(node) = self.registry.node(current) else { continue };
            match node.children() {
                Some((left, right)) => {
                    queue.push_back(left);
                    queue.push_back(right);
                }
                None => leaves.push(current),
            }
        }
        leaves
    }

    /// Flat clusters cut at `threshold`, as leaf label lists.
    ///
    /// Walks breadth first from the root. A node merged above `threshold`
    /// is split into its children; a node merged at or below it becomes one
    /// cluster with all of its leaves, whatever the heights further down.
    #[must_use]
    pub fn flat_clusters(&self, threshold: f32) -> Vec<Vec<usize>> {
        let mut clusters = Vec::new();
        let mut queue = VecDeque::from([self.root().label()]);
        while let Some(label) = queue.pop_front() {
            let node = &self.registry.nodes()[label];
            match node.children() {
                None => clusters.push(vec![label]),
                Some((left, right)) if node.merge_distance() > threshold => {
                    queue.push_back(left);
                    queue.push_back(right);
                }
                Some(_) => clusters.push(self.leaves_under(label)),
            }
        }
        clusters
    }

    /// Leaf name, for leaves.
    #[must_use]
    pub fn name(&self, label: usize) -> Option<&str> {
        self.registry.node(label).and_then(ClusterNode::name)
    }
}
