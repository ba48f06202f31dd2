//! Text output for a finished dendrogram.
//!
//! Two tab-separated formats:
//!
//! - **Tree**: every node, root first, with its children and merge height.
//! - **Clusters**: the flat partition at a cut height, one cluster per row
//!   as its size followed by the leaf names.

use std::io::Write;

use serde::Serialize;

use crate::dendrogram::{Dendrogram, Merge};
use crate::error::Result;
use crate::registry::ClusterNode;

pub const TREE_HEADER: &str = "ClusterLabel\tClusterName\tLeftChildLabel\tRightChildLabel\tDistance";
pub const CLUSTER_HEADER: &str = "ClusterSize\tClusterNodes[1,2,3...]";
/// Name column value for internal nodes.
pub const NOT_LEAF_NODE: &str = "NOT_LEAF_NODE";

#[derive(Serialize)]
struct JsonDendrogram<'a> {
    linkage: crate::Linkage,
    items: usize,
    nodes: &'a [ClusterNode],
    merges: Vec<Merge>,
}

/// Writes a [`Dendrogram`] in the line formats above.
#[derive(Debug, Clone, Copy)]
pub struct DendrogramWriter<'a> {
    dendrogram: &'a Dendrogram,
}

impl<'a> DendrogramWriter<'a> {
    #[must_use]
    pub fn new(dendrogram: &'a Dendrogram) -> Self {
        Self { dendrogram }
    }

    /// Full tree, from the root down to label 0.
    pub fn write_tree<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{TREE_HEADER}")?;
        for node in self.dendrogram.nodes().iter().rev() {
            let (name, left, right) = match node.children() {
                Some((l, r)) => (NOT_LEAF_NODE, l as i64, r as i64),
                None => (node.name().unwrap_or_default(), -1, -1),
            };
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{:.6}",
                node.label(),
                name,
                left,
                right,
                node.merge_distance()
            )?;
        }
        Ok(())
    }

    /// Flat clusters cut at `threshold`.
    pub fn write_clusters<W: Write>(&self, out: &mut W, threshold: f32) -> Result<()> {
        writeln!(out, "{CLUSTER_HEADER}")?;
        for cluster in self.dendrogram.flat_clusters(threshold) {
            write!(out, "{}", cluster.len())?;
            for label in cluster {
                write!(out, "\t{}", self.dendrogram.name(label).unwrap_or_default())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Nodes and merges as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, out: &mut W) -> Result<()> {
        let doc = JsonDendrogram {
            linkage: self.dendrogram.linkage(),
            items: self.dendrogram.base_count(),
            nodes: self.dendrogram.nodes(),
            merges: self.dendrogram.merges().collect(),
        };
        serde_json::to_writer_pretty(&mut *out, &doc)?;
        writeln!(out)?;
        Ok(())
    }
}
