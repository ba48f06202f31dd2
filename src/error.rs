//! Error types for nnchain.

use thiserror::Error;

/// Errors that can occur while loading distances or building a dendrogram.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Storage for the distance store or node array could not be reserved.
    #[error("allocation failed for {what}: {requested} elements requested")]
    Allocation {
        what: &'static str,
        requested: usize,
    },

    /// I/O error while reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer than two base items; there is nothing to merge.
    #[error("at least 2 items are required, got {0}")]
    TooFewItems(usize),

    /// Ingestion produced more distinct names than the declared item count.
    #[error("leaf label {label} out of range: only {limit} items declared")]
    LabelOutOfRange { label: usize, limit: usize },

    /// Ingestion finished with the wrong number of names or pairs.
    #[error(
        "loaded {items} items and {pairs} pairs, expected {expected_items} items and {expected_pairs} pairs"
    )]
    CountMismatch {
        expected_items: usize,
        items: usize,
        expected_pairs: usize,
        pairs: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// JSON configuration could not be parsed, or JSON output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal consistency check failed during clustering.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
