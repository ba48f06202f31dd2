//! Loading the pairwise distance relation.
//!
//! Input is plain text, one pair per line, tab separated:
//!
//! ```text
//! # comment
//! itemA	itemB	0.56
//! itemC	itemB	0.43
//! itemA	itemC	0.32
//! ```
//!
//! Each pair appears once in either orientation. Names get leaf labels in
//! order of first appearance. Bad lines (wrong field count, unparsable
//! distance, self pairs) are skipped with a warning; repeated pairs keep the
//! first distance. Loading only succeeds if exactly `N` names and
//! `N(N-1)/2` distinct pairs were seen, so clustering never starts from an
//! incomplete matrix.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{ClusterError, Result};
use crate::registry::NodeRegistry;
use crate::store::{try_alloc, DistanceStore};

const FIELD_SEPARATOR: char = '\t';
const PROGRESS_EVERY: usize = 1_000_000;

/// Bidirectional mapping between item names and leaf labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndex {
    labels: HashMap<String, usize>,
    names: Vec<String>,
}

impl NameIndex {
    #[must_use]
    pub fn label_of(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    #[must_use]
    pub fn name_of(&self, label: usize) -> Option<&str> {
        self.names.get(label).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in label order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// What happened to one input line or pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Distance stored.
    Loaded,
    /// Blank or `#` line.
    Skipped,
    /// Not three fields, or distance not a finite number.
    Malformed,
    /// Both names are the same item.
    SelfPair,
    /// Pair already loaded; first distance kept.
    Duplicate,
}

/// Feeds pairs into a registry and distance store sized for `N` items.
#[derive(Debug)]
pub struct DistanceLoader<'a> {
    registry: &'a mut NodeRegistry,
    store: &'a mut DistanceStore,
    index: NameIndex,
    assigned: Vec<bool>,
    pairs: usize,
    skipped_lines: usize,
}

impl<'a> DistanceLoader<'a> {
    pub fn new(registry: &'a mut NodeRegistry, store: &'a mut DistanceStore) -> Result<Self> {
        if registry.base_count() != store.slots() {
            return Err(ClusterError::InvalidParameter(format!(
                "registry holds {} items but distance store has {} slots",
                registry.base_count(),
                store.slots()
            )));
        }
        let assigned = try_alloc("pair bitmap", store.len(), false)?;
        Ok(Self {
            registry,
            store,
            index: NameIndex::default(),
            assigned,
            pairs: 0,
            skipped_lines: 0,
        })
    }

    /// Number of distinct pairs loaded so far.
    #[must_use]
    pub fn pairs(&self) -> usize {
        self.pairs
    }

    /// Parse and load one line of the distance file.
    pub fn load_line(&mut self, line: &str) -> Result<LineOutcome> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() || line.starts_with('#') {
            return Ok(LineOutcome::Skipped);
        }

        let mut fields = line.split(FIELD_SEPARATOR);
        let (Some(a), Some(b), Some(raw), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            warn!(line, "expected 3 tab-separated fields, skipping");
            self.skipped_lines += 1;
            return Ok(LineOutcome::Malformed);
        };

        let distance = match raw.trim().parse::<f32>() {
            Ok(d) if d.is_finite() => d,
            _ => {
                warn!(line, distance = raw, "invalid distance, skipping");
                self.skipped_lines += 1;
                return Ok(LineOutcome::Malformed);
            }
        };

        self.insert(a, b, distance)
    }

    /// Load the distance between two named items.
    pub fn insert(&mut self, a: &str, b: &str, distance: f32) -> Result<LineOutcome> {
        let left = self.label_for(a)?;
        let right = self.label_for(b)?;

        if left == right {
            warn!(name = a, "pair names the same item twice, skipping");
            self.skipped_lines += 1;
            return Ok(LineOutcome::SelfPair);
        }

        self.create_leaf(left, a)?;
        self.create_leaf(right, b)?;

        let idx = self.store.index_of(left, right);
        if self.assigned[idx] {
            debug!(a, b, "duplicate pair ignored");
            return Ok(LineOutcome::Duplicate);
        }
        self.assigned[idx] = true;
        self.store.set(left, right, distance);
        self.pairs += 1;
        if self.pairs % PROGRESS_EVERY == 0 {
            debug!(pairs = self.pairs, "loading distances");
        }
        Ok(LineOutcome::Loaded)
    }

    /// Load every line from `reader`.
    pub fn load_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for line in reader.lines() {
            self.load_line(&line?)?;
        }
        Ok(())
    }

    /// Check that the relation is complete and hand back the name index.
    pub fn finish(self) -> Result<NameIndex> {
        let expected_items = self.registry.base_count();
        let expected_pairs = self.store.len();
        if self.index.len() != expected_items
            || self.pairs != expected_pairs
            || !self.registry.is_complete()
        {
            return Err(ClusterError::CountMismatch {
                expected_items,
                items: self.index.len(),
                expected_pairs,
                pairs: self.pairs,
            });
        }
        info!(
            items = expected_items,
            pairs = self.pairs,
            skipped_lines = self.skipped_lines,
            "distance matrix loaded"
        );
        Ok(self.index)
    }

    fn label_for(&mut self, name: &str) -> Result<usize> {
        if let Some(label) = self.index.label_of(name) {
            return Ok(label);
        }
        let label = self.index.names.len();
        let limit = self.registry.base_count();
        if label >= limit {
            return Err(ClusterError::LabelOutOfRange { label, limit });
        }
        self.index.labels.insert(name.to_owned(), label);
        self.index.names.push(name.to_owned());
        Ok(label)
    }

    fn create_leaf(&mut self, label: usize, name: &str) -> Result<()> {
        // Leaves start in the slot matching their label.
        if self.registry.create_leaf(label, label, name)? {
            self.store.claim(label, label);
        }
        Ok(())
    }
}

/// Load a distance file into `registry` and `store`.
pub fn load_path(
    path: impl AsRef<Path>,
    registry: &mut NodeRegistry,
    store: &mut DistanceStore,
) -> Result<NameIndex> {
    let path = path.as_ref();
    let file = File::open(path)?;
    debug!(path = %path.display(), "reading distance file");
    load_reader(BufReader::new(file), registry, store)
}

/// Load a distance relation from any buffered reader.
pub fn load_reader<R: BufRead>(
    reader: R,
    registry: &mut NodeRegistry,
    store: &mut DistanceStore,
) -> Result<NameIndex> {
    let mut loader = DistanceLoader::new(registry, store)?;
    loader.load_reader(reader)?;
    loader.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(n: usize) -> (NodeRegistry, DistanceStore) {
        (NodeRegistry::new(n).unwrap(), DistanceStore::new(n).unwrap())
    }

    const FOUR: &str = "# four items\n\
                        A\tB\t0.1\n\
                        A\tC\t0.9\n\
                        \n\
                        A\tD\t0.9\n\
                        B\tC\t0.9\n\
                        B\tD\t0.9\n\
                        C\tD\t0.2\n";

    #[test]
    fn loads_complete_relation() {
        let (mut registry, mut store) = fresh(4);
        let index = load_reader(FOUR.as_bytes(), &mut registry, &mut store).unwrap();

        assert_eq!(index.len(), 4);
        assert_eq!(index.label_of("A"), Some(0));
        assert_eq!(index.label_of("D"), Some(3));
        assert_eq!(index.name_of(2), Some("C"));
        assert!((store.get(0, 1) - 0.1).abs() < 1e-6);
        assert!((store.get(3, 2) - 0.2).abs() < 1e-6);
        assert_eq!(store.active_slots(), 4);
        assert!(registry.is_complete());
    }

    #[test]
    fn missing_pair_fails() {
        let (mut registry, mut store) = fresh(4);
        let partial: String = FOUR.lines().filter(|l| !l.starts_with("C\tD")).map(|l| format!("{l}\n")).collect();
        let err = load_reader(partial.as_bytes(), &mut registry, &mut store).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::CountMismatch {
                expected_items: 4,
                items: 4,
                expected_pairs: 6,
                pairs: 5
            }
        ));
    }

    #[test]
    fn too_many_names_is_fatal() {
        let (mut registry, mut store) = fresh(2);
        let err = load_reader("a\tb\t1\na\tc\t2\n".as_bytes(), &mut registry, &mut store).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::LabelOutOfRange { label: 2, limit: 2 }
        ));
    }

    #[test]
    fn duplicate_pair_keeps_first_distance() {
        let (mut registry, mut store) = fresh(2);
        let mut loader = DistanceLoader::new(&mut registry, &mut store).unwrap();
        assert_eq!(loader.load_line("x\ty\t0.3").unwrap(), LineOutcome::Loaded);
        assert_eq!(loader.load_line("y\tx\t0.8").unwrap(), LineOutcome::Duplicate);
        assert_eq!(loader.pairs(), 1);
        loader.finish().unwrap();
        assert!((store.get(0, 1) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn zero_distance_counts_as_loaded() {
        let (mut registry, mut store) = fresh(3);
        let input = "a\tb\t0\na\tc\t0.0\nb\tc\t1\na\tb\t5\n";
        load_reader(input.as_bytes(), &mut registry, &mut store).unwrap();
        assert_eq!(store.get(0, 1), 0.0);
    }

    #[test]
    fn bad_lines_are_skipped() {
        let (mut registry, mut store) = fresh(2);
        let mut loader = DistanceLoader::new(&mut registry, &mut store).unwrap();
        assert_eq!(loader.load_line("only\ttwo").unwrap(), LineOutcome::Malformed);
        assert_eq!(loader.load_line("a\tb\t1\textra").unwrap(), LineOutcome::Malformed);
        assert_eq!(loader.load_line("a\tb\tfar").unwrap(), LineOutcome::Malformed);
        assert_eq!(loader.load_line("a\tb\tNaN").unwrap(), LineOutcome::Malformed);
        assert_eq!(loader.load_line("a\ta\t0.5").unwrap(), LineOutcome::SelfPair);
        assert_eq!(loader.load_line("#a\tb\t1").unwrap(), LineOutcome::Skipped);
        assert_eq!(loader.load_line("\r\n").unwrap(), LineOutcome::Skipped);
        assert_eq!(loader.load_line("a\tb\t 0.75\r\n").unwrap(), LineOutcome::Loaded);
        let index = loader.finish().unwrap();
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!((store.get(0, 1) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn mismatched_sizes_rejected() {
        let mut registry = NodeRegistry::new(3).unwrap();
        let mut store = DistanceStore::new(4).unwrap();
        assert!(matches!(
            DistanceLoader::new(&mut registry, &mut store),
            Err(ClusterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let (mut registry, mut store) = fresh(2);
        let err = load_path("/nonexistent/distances.tsv", &mut registry, &mut store).unwrap_err();
        assert!(matches!(err, ClusterError::Io(_)));
    }
}
