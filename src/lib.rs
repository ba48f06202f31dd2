//! nnchain: agglomerative hierarchical clustering with the nearest-neighbor chain.
//!
//! Builds a dendrogram over `N` items from their complete pairwise distance
//! relation in O(N²) time and O(N²) memory.
//!
//! - `store`: condensed triangular distance storage with a fixed slot arena
//! - `registry`: the node array (leaves and merges) addressed by label
//! - `linkage`: distance update rules (average, single, complete, Ward)
//! - `chain`: the nearest-neighbor chain merge loop
//! - `dendrogram` / `writer`: inspecting and printing the finished tree
//! - `ingest`: loading tab-separated distance files
//!
//! # Usage
//!
//! ```rust
//! use nnchain::{AgglomerativeClusterer, ClusterParams, DendrogramWriter};
//!
//! # fn main() -> nnchain::Result<()> {
//! let input = "A\tB\t0.1\nA\tC\t0.9\nA\tD\t0.9\nB\tC\t0.9\nB\tD\t0.9\nC\tD\t0.2\n";
//! let dendrogram = AgglomerativeClusterer::from_reader(input.as_bytes(), 4, ClusterParams::default())?
//!     .cluster()?;
//!
//! assert_eq!(dendrogram.root().leaf_count(), 4);
//! assert_eq!(dendrogram.flat_clusters(0.15).len(), 3);
//!
//! let mut out = Vec::new();
//! DendrogramWriter::new(&dendrogram).write_clusters(&mut out, 0.15)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Critical Nuances
//!
//! ## Reducibility
//!
//! The chain only merges reciprocal nearest neighbors. That yields the same
//! tree as the naive "merge the globally closest pair" loop only when the
//! linkage is *reducible*: a merged cluster is never closer to a third
//! cluster than both of its parts were. All rules in [`Linkage`] are.
//! Centroid and median linkage are not, and are deliberately absent.
//!
//! ## Merge heights are not sorted
//!
//! Internal labels follow the order merges *happened*, which is not the
//! order of their heights. Two independent merges deep in different chains
//! can appear in either order. Heights are monotone along each root-to-leaf
//! path, which is what the threshold cut relies on.
//!
//! ## Ties
//!
//! Nearest-neighbor ties go to the lowest label, and leaf labels follow
//! input order. With equal distances the tree shape can therefore change
//! when input lines are reordered. Heights do not.

pub mod chain;
pub mod clusterer;
pub mod dendrogram;
pub mod error;
pub mod ingest;
pub mod linkage;
pub mod params;
pub mod registry;
pub mod store;
pub mod writer;

// Re-exports
pub use chain::{ChainStats, NnChain};
pub use clusterer::AgglomerativeClusterer;
pub use dendrogram::{Dendrogram, Merge};
pub use error::{ClusterError, Result};
pub use ingest::{DistanceLoader, LineOutcome, NameIndex};
pub use linkage::Linkage;
pub use params::ClusterParams;
pub use registry::{ClusterNode, MergeOutcome, Neighbor, NodeRegistry};
pub use store::DistanceStore;
pub use writer::DendrogramWriter;
