//! End-to-end clustering run: load, merge, hand back the dendrogram.

use std::io::BufRead;
use std::path::Path;

use tracing::info;

use crate::chain::{ChainStats, NnChain};
use crate::dendrogram::Dendrogram;
use crate::error::{ClusterError, Result};
use crate::ingest::{self, DistanceLoader, NameIndex};
use crate::params::ClusterParams;
use crate::registry::NodeRegistry;
use crate::store::DistanceStore;

/// Owns all storage for one run over `N` items.
///
/// Storage is sized once from `N`: `N(N-1)/2` distances and `2N-1` nodes.
/// [`cluster`](Self::cluster) consumes the clusterer, drops the distance
/// store and keeps the node registry inside the returned [`Dendrogram`].
#[derive(Debug)]
pub struct AgglomerativeClusterer {
    registry: NodeRegistry,
    store: DistanceStore,
    names: NameIndex,
    params: ClusterParams,
}

impl AgglomerativeClusterer {
    fn allocate(n: usize, params: &ClusterParams) -> Result<(NodeRegistry, DistanceStore)> {
        params.validate()?;
        if n < 2 {
            return Err(ClusterError::TooFewItems(n));
        }
        Ok((NodeRegistry::new(n)?, DistanceStore::new(n)?))
    }

    /// Load `n` items from a tab-separated distance file.
    pub fn from_path(path: impl AsRef<Path>, n: usize, params: ClusterParams) -> Result<Self> {
        let (mut registry, mut store) = Self::allocate(n, &params)?;
        let names = ingest::load_path(path, &mut registry, &mut store)?;
        Ok(Self {
            registry,
            store,
            names,
            params,
        })
    }

    /// Load `n` items from tab-separated lines.
    pub fn from_reader<R: BufRead>(reader: R, n: usize, params: ClusterParams) -> Result<Self> {
        let (mut registry, mut store) = Self::allocate(n, &params)?;
        let names = ingest::load_reader(reader, &mut registry, &mut store)?;
        Ok(Self {
            registry,
            store,
            names,
            params,
        })
    }

    /// Build from item names and a distance function over their indices.
    ///
    /// `distance(a, b)` is called once per pair with `a < b` and must be
    /// finite. Names must be distinct.
    pub fn from_fn<S, F>(names: &[S], params: ClusterParams, mut distance: F) -> Result<Self>
    where
        S: AsRef<str>,
        F: FnMut(usize, usize) -> f32,
    {
        let n = names.len();
        let (mut registry, mut store) = Self::allocate(n, &params)?;
        let mut loader = DistanceLoader::new(&mut registry, &mut store)?;
        for b in 1..n {
            for a in 0..b {
                let d = distance(a, b);
                if !d.is_finite() {
                    return Err(ClusterError::InvalidParameter(format!(
                        "distance between items {a} and {b} is not finite: {d}"
                    )));
                }
                loader.insert(names[a].as_ref(), names[b].as_ref(), d)?;
            }
        }
        let names = loader.finish()?;
        Ok(Self {
            registry,
            store,
            names,
            params,
        })
    }

    #[must_use]
    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /// Number of base items `N`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.base_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    /// Loaded distance between two named items.
    #[must_use]
    pub fn distance(&self, a: &str, b: &str) -> Option<f32> {
        let (la, lb) = (self.names.label_of(a)?, self.names.label_of(b)?);
        (la != lb).then(|| self.store.get(la, lb))
    }

    /// Run the nearest-neighbor chain to completion.
    pub fn cluster(self) -> Result<Dendrogram> {
        self.cluster_with_stats().map(|(dendrogram, _)| dendrogram)
    }

    /// Like [`cluster`](Self::cluster), also returning engine counters.
    pub fn cluster_with_stats(self) -> Result<(Dendrogram, ChainStats)> {
        let Self {
            mut registry,
            mut store,
            names,
            params,
        } = self;

        let stats = NnChain::new(params.linkage).run(&mut registry, &mut store)?;
        info!(
            items = registry.base_count(),
            linkage = %params.linkage,
            root_distance = registry.nodes()[registry.len() - 1].merge_distance(),
            "clustering complete"
        );
        Ok((Dendrogram::new(registry, names, params.linkage)?, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Linkage;

    #[test]
    fn from_fn_labels_follow_name_order() {
        let names = ["w", "x", "y", "z"];
        let clusterer =
            AgglomerativeClusterer::from_fn(&names, ClusterParams::default(), |a, b| (b - a) as f32)
                .unwrap();
        for (label, name) in names.iter().enumerate() {
            assert_eq!(clusterer.names().label_of(name), Some(label));
        }
        assert_eq!(clusterer.distance("w", "z"), Some(3.0));
        assert_eq!(clusterer.distance("z", "w"), Some(3.0));
        assert_eq!(clusterer.distance("w", "w"), None);
        assert_eq!(clusterer.distance("w", "q"), None);
    }

    #[test]
    fn from_fn_rejects_duplicate_names() {
        let err = AgglomerativeClusterer::from_fn(&["a", "b", "a"], ClusterParams::default(), |_, _| 1.0)
            .unwrap_err();
        assert!(matches!(err, ClusterError::CountMismatch { .. }));
    }

    #[test]
    fn from_fn_rejects_non_finite() {
        let err = AgglomerativeClusterer::from_fn(&["a", "b"], ClusterParams::default(), |_, _| f32::NAN)
            .unwrap_err();
        assert!(matches!(err, ClusterError::InvalidParameter(_)));
    }

    #[test]
    fn single_item_is_rejected() {
        let err = AgglomerativeClusterer::from_reader("".as_bytes(), 1, ClusterParams::default())
            .unwrap_err();
        assert!(matches!(err, ClusterError::TooFewItems(1)));
    }

    #[test]
    fn invalid_params_rejected_before_loading() {
        let params = ClusterParams::default().with_threshold(-0.5);
        let err = AgglomerativeClusterer::from_reader("a\tb\t1\n".as_bytes(), 2, params).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidParameter(_)));
    }

    #[test]
    fn stats_count_every_merge() {
        let names: Vec<String> = (0..10).map(|i| format!("n{i}")).collect();
        let params = ClusterParams::default().with_linkage(Linkage::Complete);
        let clusterer =
            AgglomerativeClusterer::from_fn(&names, params, |a, b| ((a * 31 + b * 17) % 23) as f32 + 0.5)
                .unwrap();
        let (dendrogram, stats) = clusterer.cluster_with_stats().unwrap();
        assert_eq!(stats.merges, 9);
        assert_eq!(dendrogram.len(), 19);
        assert_eq!(dendrogram.linkage(), Linkage::Complete);
    }
}
