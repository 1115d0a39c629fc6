//! Run configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Command-line flags are applied on top of a loaded file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::embedding::DEFAULT_EMBEDDING_DIM;
use crate::error::{CellmapResult, ConfigError};
use crate::ranker::{SimilarityMethod, ThresholdBoundary};

/// Default semantic threshold (strictly greater-than).
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Default shortlist length.
pub const DEFAULT_TOP_K: usize = 5;

/// Configuration for one annotation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotatorConfig {
    /// Minimum (exclusive) similarity for a confident semantic match.
    pub threshold: f64,
    /// Maximum shortlist length per unresolved label.
    pub top_k: usize,
    /// Similarity method identifier.
    pub method: SimilarityMethod,
    /// Placement of scores equal to the threshold.
    pub boundary: ThresholdBoundary,
    /// Dimension of the hashing embedder.
    pub embedding_dim: usize,
    /// Write the raw label into `cell line` for unresolved rows.
    pub echo_unresolved_label: bool,
    /// Run the advisory semantic pass over unresolved labels.
    pub semantic_pass: bool,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            method: SimilarityMethod::default(),
            boundary: ThresholdBoundary::default(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            echo_unresolved_label: false,
            semantic_pass: true,
        }
    }
}

impl AnnotatorConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFile`] for malformed JSON, unknown fields
    /// or an unknown similarity method, and any error from [`Self::validate`].
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| ConfigError::InvalidFile {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, otherwise see
    /// [`Self::from_json`].
    pub fn load(path: &Path) -> CellmapResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThreshold`] for a non-finite threshold or
    /// one outside the cosine range, and [`ConfigError::ModelUnavailable`] for
    /// a zero embedding dimension.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || !(-1.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold {
                value: self.threshold,
            });
        }
        if self.embedding_dim == 0 {
            return Err(ConfigError::ModelUnavailable {
                reason: "embedding_dim must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
