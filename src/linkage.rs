//! Linkage update rules.
//!
//! After clusters `A` and `B` merge, the distance from the new cluster to
//! every other active cluster `C` is derived from quantities already in the
//! store (Lance-Williams recurrence):
//!
//! ```text
//! d(A∪B, C) = f(|A|, |B|, |C|, d(A,C), d(B,C), d(A,B))
//! ```
//!
//! All four variants are *reducible*: merging two clusters never produces a
//! cluster closer to a third than either part was. The nearest-neighbor
//! chain relies on this to merge reciprocal nearest neighbors greedily.
//!
//! # References
//!
//! - Lance & Williams (1967): "A general theory of classificatory sorting strategies"
//! - Müllner (2011): "Modern hierarchical, agglomerative clustering algorithms"

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Rule for the distance between a merged cluster and a third cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Unweighted average of all pairwise item distances (UPGMA).
    #[default]
    Average,
    /// Nearest point: minimum pairwise item distance.
    Single,
    /// Farthest point: maximum pairwise item distance.
    Complete,
    /// Ward's minimum variance criterion.
    Ward,
}

impl Linkage {
    pub const ALL: [Linkage; 4] = [
        Linkage::Average,
        Linkage::Single,
        Linkage::Complete,
        Linkage::Ward,
    ];

    /// Distance from `A∪B` to `C`.
    ///
    /// `size_*` are leaf counts; `d_ac`, `d_bc` are pre-merge distances and
    /// `d_ab` the distance at which `A` and `B` merged.
    #[inline]
    #[must_use]
    pub fn update(
        self,
        size_a: usize,
        size_b: usize,
        size_c: usize,
        d_ac: f32,
        d_bc: f32,
        d_ab: f32,
    ) -> f32 {
        match self {
            Linkage::Average => {
                let (na, nb) = (size_a as f32, size_b as f32);
                (na * d_ac + nb * d_bc) / (na + nb)
            }
            Linkage::Single => d_ac.min(d_bc),
            Linkage::Complete => d_ac.max(d_bc),
            Linkage::Ward => {
                let (na, nb, nc) = (size_a as f32, size_b as f32, size_c as f32);
                let sq = ((na + nc) * d_ac * d_ac + (nb + nc) * d_bc * d_bc - nc * d_ab * d_ab)
                    / (na + nb + nc);
                // Rounding can push an exact zero slightly negative.
                sq.max(0.0).sqrt()
            }
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Linkage::Average => "average",
            Linkage::Single => "single",
            Linkage::Complete => "complete",
            Linkage::Ward => "ward",
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Linkage {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "average" | "upgma" => Ok(Linkage::Average),
            "single" => Ok(Linkage::Single),
            "complete" => Ok(Linkage::Complete),
            "ward" => Ok(Linkage::Ward),
            other => Err(ClusterError::InvalidParameter(format!(
                "unknown linkage '{other}', expected one of average, single, complete, ward"
            ))),
        }
    }
}
