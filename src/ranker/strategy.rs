//! Ranking strategies.
//!
//! The similarity method is a closed set chosen once at configuration time.
//! Every strategy exposes the same two operations, `embed` and `score`, so
//! the ranker and the annotator never branch on the method.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embedding::Embedder;
use crate::error::ConfigError;

/// Identifier of a similarity method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SimilarityMethod {
    /// Cosine similarity over dense embeddings.
    #[default]
    Cosine,
}

impl SimilarityMethod {
    /// Stable identifier used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
        }
    }

    /// Builds the strategy for this method around a shared embedding provider.
    #[must_use]
    pub fn strategy(self, embedder: Arc<dyn Embedder>) -> Box<dyn RankingStrategy> {
        match self {
            Self::Cosine => Box::new(CosineStrategy::new(embedder)),
        }
    }
}

impl FromStr for SimilarityMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("cosine") {
            Ok(Self::Cosine)
        } else {
            Err(ConfigError::UnknownSimilarityMethod {
                name: name.to_string(),
            })
        }
    }
}

impl TryFrom<String> for SimilarityMethod {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SimilarityMethod> for String {
    fn from(method: SimilarityMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns text into vectors and vectors into a similarity score.
pub trait RankingStrategy: Send + Sync {
    /// Method this strategy implements.
    fn method(&self) -> SimilarityMethod;

    /// Dimension of vectors returned by [`Self::embed`].
    fn dim(&self) -> usize;

    /// Vector representation of an already-normalized string.
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Similarity between two vectors of dimension [`Self::dim`].
    fn score(&self, query: &[f32], candidate: &[f32]) -> f64;
}

/// Cosine similarity over the vectors of an [`Embedder`].
pub struct CosineStrategy {
    embedder: Arc<dyn Embedder>,
}

impl CosineStrategy {
    /// Wraps a shared embedding provider.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

impl fmt::Debug for CosineStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosineStrategy")
            .field("dim", &self.embedder.dim())
            .finish()
    }
}

impl RankingStrategy for CosineStrategy {
    fn method(&self) -> SimilarityMethod {
        SimilarityMethod::Cosine
    }

    fn dim(&self) -> usize {
        self.embedder.dim()
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        self.embedder.embed(text)
    }

    fn score(&self, query: &[f32], candidate: &[f32]) -> f64 {
        cosine_similarity(query, candidate)
    }
}

/// Cosine similarity; zero-norm or mismatched inputs score `0.0`.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let xf = f64::from(x);
        let yf = f64::from(y);
        dot += xf * yf;
        norm_a += xf * xf;
        norm_b += yf * yf;
    }

    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_finite() {
        sim.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
