//! # cellmap - cell line label resolution
//!
//! cellmap resolves free-text cell line labels, as written by experimenters in
//! SDRF sample tables, against a Cellosaurus-style reference table. Every
//! input row gets exactly one annotated output row; labels that cannot be
//! resolved get an explicit `not available` row plus an advisory shortlist of
//! semantically similar reference entries.
//!
//! ## Core Concepts
//!
//! - **Reference index**: ordered, read-only view of the reference table
//! - **Lexical tier**: exact name/accession match, then first-hit synonym containment
//! - **Semantic tier**: cosine similarity over embeddings of every synonym,
//!   thresholded and cut to `top_k`
//! - **Annotator**: drives labels through both tiers in two decoupled passes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cellmap::{AnnotatorConfig, Annotator, HashingEmbedder, ReferenceIndex, SemanticRanker};
//!
//! let config = AnnotatorConfig::default();
//! let index = ReferenceIndex::build(cellmap::table::read_reference_file(db_path)?);
//! let embedder = Arc::new(HashingEmbedder::new(config.embedding_dim)?);
//! let ranker = SemanticRanker::new(config.method, embedder).with_boundary(config.boundary);
//!
//! let labels = cellmap::table::read_query_file(sdrf_path)?;
//! let annotation = Annotator::new(&index, Some(&ranker), &config).annotate(&labels)?;
//! cellmap::table::write_annotated_file(output_path, &annotation.rows)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model and loading
pub mod config;
pub mod error;
pub mod record;
pub mod schema;
pub mod table;

// Resolution
pub mod annotate;
pub mod embedding;
pub mod index;
pub mod lexical;
pub mod ranker;

// Re-export primary types at crate root for convenience
pub use annotate::{Annotation, Annotator, MatchResult, MatchTier, Suggestion};
pub use config::AnnotatorConfig;
pub use embedding::{Embedder, HashingEmbedder};
pub use error::{CellmapError, CellmapResult, ConfigError, SchemaError};
pub use index::ReferenceIndex;
pub use lexical::{LexicalHit, LexicalKind};
pub use ranker::{Candidate, RankingStrategy, SemanticRanker, SimilarityMethod, ThresholdBoundary};
pub use record::{AnnotatedRow, CanonicalRecord, QueryLabel, SynonymSet};
