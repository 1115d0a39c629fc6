//! Error types for cellmap.
//!
//! All errors are strongly typed using thiserror. Structural problems
//! (missing columns, bad configuration) are fatal and abort a run before any
//! resolution work starts. A label that cannot be resolved is *not* an error;
//! see [`crate::annotate::MatchResult`].

use thiserror::Error;

/// Errors raised while validating the shape of an input table.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{table} table is missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        table: String,
        columns: Vec<String>,
    },

    #[error("{table} table has no header row")]
    MissingHeader {
        table: String,
    },
}

/// Errors raised while building the run configuration or the embedding provider.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown similarity method: '{name}'")]
    UnknownSimilarityMethod {
        name: String,
    },

    #[error("Threshold {value} must be a finite number in [-1.0, 1.0]")]
    InvalidThreshold {
        value: f64,
    },

    #[error("Embedding provider unavailable: {reason}")]
    ModelUnavailable {
        reason: String,
    },

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    EmbeddingDimension {
        actual: usize,
        expected: usize,
    },

    #[error("Invalid configuration file: {message}")]
    InvalidFile {
        message: String,
    },
}

/// Top-level error type for cellmap.
#[derive(Debug, Error)]
pub enum CellmapError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table error: {0}")]
    Table(#[from] csv::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl CellmapError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a schema error.
    #[must_use]
    pub const fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this error was detected before any resolution work.
    ///
    /// Schema and configuration errors are raised while loading; everything
    /// else comes from the environment (files, locks).
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::Schema(_) | Self::Config(_))
    }
}

/// Result type alias for cellmap operations.
pub type CellmapResult<T> = Result<T, CellmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_lists_every_column() {
        let err = SchemaError::MissingColumns {
            table: "SDRF".to_string(),
            columns: vec!["source name".to_string(), "characteristics[cell line]".to_string()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("SDRF"));
        assert!(msg.contains("source name, characteristics[cell line]"));
    }

    #[test]
    fn test_unknown_method_message() {
        let err = ConfigError::UnknownSimilarityMethod {
            name: "jaccard".to_string(),
        };
        assert!(format!("{err}").contains("'jaccard'"));
    }

    #[test]
    fn test_embedding_dimension_message() {
        let err = ConfigError::EmbeddingDimension { actual: 3, expected: 4 };
        let msg = format!("{err}");
        assert!(msg.contains("3 dimensions"));
        assert!(msg.contains("expected 4"));
    }

    #[test]
    fn test_cellmap_error_from_schema() {
        let err: CellmapError = SchemaError::MissingHeader {
            table: "database".to_string(),
        }
        .into();
        assert!(err.is_schema());
        assert!(err.is_structural());
        assert!(!err.is_config());
    }

    #[test]
    fn test_cellmap_error_from_config() {
        let err: CellmapError = ConfigError::InvalidThreshold { value: 2.0 }.into();
        assert!(err.is_config());
        assert!(err.is_structural());
    }

    #[test]
    fn test_cellmap_error_internal() {
        let err = CellmapError::internal("poisoned lock");
        assert!(!err.is_structural());
        assert!(format!("{err}").contains("poisoned lock"));
    }
}
