//! Run configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};
use crate::linkage::Linkage;

/// Parameters for one clustering run.
///
/// Can be read from JSON, e.g. `{"linkage": "ward", "threshold": 0.3}`.
/// Missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Distance update rule applied after every merge.
    pub linkage: Linkage,

    /// Cut height for flat clusters: nodes merged at or below it form one cluster.
    pub threshold: f32,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            linkage: Linkage::Average,
            threshold: 0.15,
        }
    }
}

impl ClusterParams {
    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ClusterError::InvalidParameter(format!(
                "threshold must be a finite non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Read and validate parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let params: Self = serde_json::from_reader(BufReader::new(file))?;
        params.validate()?;
        Ok(params)
    }
}
