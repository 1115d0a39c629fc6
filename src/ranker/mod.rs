//! Embedding similarity ranker.
//!
//! Fallback tier for labels the lexical resolver could not place. Each
//! candidate's score is the best cosine similarity between the query and any
//! of its synonyms (canonical name included), rounded to
//! [`SCORE_DECIMALS`] digits so repeated runs make identical threshold
//! decisions.
//!
//! Ordering contract:
//! - above-threshold candidates first, by descending score;
//! - then below-threshold candidates as filler, by descending score;
//! - ties keep first-seen candidate order;
//! - at most `top_k` entries.
//!
//! Whether a score exactly equal to the threshold lands in either partition is
//! governed by [`ThresholdBoundary`]. The default excludes it from both.

mod cache;
mod strategy;

pub use cache::{normalize, CacheStats, EmbeddingCache, NormalizationCache};
pub use strategy::{cosine_similarity, CosineStrategy, RankingStrategy, SimilarityMethod};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::Embedder;
use crate::error::{CellmapResult, ConfigError};
use crate::record::SynonymSet;

/// Decimal digits kept when rounding similarity scores.
pub const SCORE_DECIMALS: i32 = 3;

/// Rounds a similarity score to [`SCORE_DECIMALS`] digits.
#[must_use]
pub fn round_score(score: f64) -> f64 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    (score * scale).round() / scale
}

/// Placement of a score exactly equal to the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdBoundary {
    /// Neither above nor below: dropped from the result entirely.
    #[default]
    Exclude,
    /// Treated as a confident (above-threshold) match.
    Above,
    /// Treated as below-threshold filler.
    Below,
}

impl ThresholdBoundary {
    /// Returns true if `score` counts as a confident match under this policy.
    #[must_use]
    pub fn admits(self, score: f64, threshold: f64) -> bool {
        score > threshold || (self == Self::Above && score == threshold)
    }
}

/// A ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Canonical name of the reference record.
    pub canonical_name: String,
    /// Rounded similarity score.
    pub score: f64,
}

impl Candidate {
    /// Creates a candidate.
    #[must_use]
    pub fn new(canonical_name: impl Into<String>, score: f64) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            score,
        }
    }
}

/// Scored candidates split around the threshold, each in descending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Candidates treated as confident matches.
    pub above: Vec<Candidate>,
    /// Candidates usable as filler.
    pub below: Vec<Candidate>,
}

/// Splits scored candidates around `threshold`.
///
/// Input order is kept for equal scores (stable sort).
#[must_use]
pub fn partition(scored: Vec<Candidate>, threshold: f64, boundary: ThresholdBoundary) -> Partition {
    let mut out = Partition::default();
    for candidate in scored {
        if candidate.score > threshold {
            out.above.push(candidate);
        } else if candidate.score < threshold {
            out.below.push(candidate);
        } else {
            match boundary {
                ThresholdBoundary::Exclude => {}
                ThresholdBoundary::Above => out.above.push(candidate),
                ThresholdBoundary::Below => out.below.push(candidate),
            }
        }
    }
    out.above.sort_by(|a, b| b.score.total_cmp(&a.score));
    out.below.sort_by(|a, b| b.score.total_cmp(&a.score));
    out
}

/// Above-threshold candidates, then below-threshold filler, truncated to `top_k`.
#[must_use]
pub fn select(
    scored: Vec<Candidate>,
    threshold: f64,
    top_k: usize,
    boundary: ThresholdBoundary,
) -> Vec<Candidate> {
    let Partition { above, below } = partition(scored, threshold, boundary);
    above.into_iter().chain(below).take(top_k).collect()
}

/// Ranks reference candidates against free-text queries.
///
/// Holds the strategy and both memoization caches; build one per run and
/// reuse it for every query.
pub struct SemanticRanker {
    strategy: Box<dyn RankingStrategy>,
    boundary: ThresholdBoundary,
    normalized: NormalizationCache,
    embeddings: EmbeddingCache,
}

impl fmt::Debug for SemanticRanker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticRanker")
            .field("method", &self.strategy.method())
            .field("dim", &self.strategy.dim())
            .field("boundary", &self.boundary)
            .finish_non_exhaustive()
    }
}

impl SemanticRanker {
    /// Creates a ranker for `method` around a shared embedding provider.
    #[must_use]
    pub fn new(method: SimilarityMethod, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_strategy(method.strategy(embedder))
    }

    /// Creates a ranker around an explicit strategy.
    #[must_use]
    pub fn with_strategy(strategy: Box<dyn RankingStrategy>) -> Self {
        Self {
            strategy,
            boundary: ThresholdBoundary::default(),
            normalized: NormalizationCache::new(),
            embeddings: EmbeddingCache::new(),
        }
    }

    /// Sets the threshold boundary policy.
    #[must_use]
    pub fn with_boundary(mut self, boundary: ThresholdBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Active similarity method.
    #[must_use]
    pub fn method(&self) -> SimilarityMethod {
        self.strategy.method()
    }

    /// Active threshold boundary policy.
    #[must_use]
    pub const fn boundary(&self) -> ThresholdBoundary {
        self.boundary
    }

    fn vector_for(&self, raw: &str) -> CellmapResult<Option<Arc<[f32]>>> {
        let key = self.normalized.get(raw)?;
        if key.is_empty() {
            return Ok(None);
        }
        let expected = self.strategy.dim();
        let vector = self.embeddings.get_or_try_insert(&key, |text| {
            let v = self.strategy.embed(text);
            if v.len() == expected {
                Ok(v)
            } else {
                Err(ConfigError::EmbeddingDimension {
                    actual: v.len(),
                    expected,
                }
                .into())
            }
        })?;
        Ok(Some(vector))
    }

    /// Scores every candidate in input order, without thresholding.
    ///
    /// A candidate's score is the maximum over its terms, rounded.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the embedding provider breaks its
    /// dimension contract, or an internal error on a poisoned cache.
    pub fn score_all(&self, query: &str, synonym_sets: &[SynonymSet]) -> CellmapResult<Vec<Candidate>> {
        let Some(query_vec) = self.vector_for(query)? else {
            return Ok(Vec::new());
        };

        let mut scored = Vec::with_capacity(synonym_sets.len());
        for set in synonym_sets {
            let mut best: Option<f64> = None;
            for term in set.terms() {
                let sim = match self.vector_for(term)? {
                    Some(term_vec) => self.strategy.score(&query_vec, &term_vec),
                    None => 0.0,
                };
                best = Some(best.map_or(sim, |b| b.max(sim)));
            }
            scored.push(Candidate::new(
                set.canonical_name.clone(),
                round_score(best.unwrap_or(0.0)),
            ));
        }
        Ok(scored)
    }

    /// Ranked, thresholded shortlist for `query`.
    ///
    /// An empty query or an empty candidate list yields an empty shortlist.
    ///
    /// # Errors
    ///
    /// See [`Self::score_all`].
    pub fn rank(
        &self,
        query: &str,
        synonym_sets: &[SynonymSet],
        threshold: f64,
        top_k: usize,
    ) -> CellmapResult<Vec<Candidate>> {
        if top_k == 0 || synonym_sets.is_empty() {
            return Ok(Vec::new());
        }
        let scored = self.score_all(query, synonym_sets)?;
        let ranked = select(scored, threshold, top_k, self.boundary);
        debug!(
            query,
            candidates = synonym_sets.len(),
            returned = ranked.len(),
            "semantic ranking complete"
        );
        Ok(ranked)
    }

    /// Normalization and embedding cache counters.
    ///
    /// # Errors
    ///
    /// Returns an internal error on a poisoned cache.
    pub fn cache_stats(&self) -> CellmapResult<(CacheStats, CacheStats)> {
        Ok((self.normalized.stats()?, self.embeddings.stats()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::embedding::HashingEmbedder;

    fn c(name: &str, score: f64) -> Candidate {
        Candidate::new(name, score)
    }

    fn names(list: &[Candidate]) -> Vec<&str> {
        list.iter().map(|c| c.canonical_name.as_str()).collect()
    }

    #[test]
    fn rounding_keeps_three_decimals() {
        assert_eq!(round_score(0.899_96), 0.9);
        assert_eq!(round_score(0.123_4), 0.123);
        assert_eq!(round_score(-0.000_4), -0.0);
    }

    #[test]
    fn above_threshold_precedes_filler() {
        let scored = vec![c("a", 0.3), c("b", 0.95), c("c", 0.5), c("d", 0.91)];
        let out = select(scored, 0.9, 10, ThresholdBoundary::Exclude);
        assert_eq!(names(&out), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn filler_is_returned_without_confident_matches() {
        let scored = vec![c("a", 0.3), c("b", 0.5)];
        let out = select(scored, 0.9, 1, ThresholdBoundary::Exclude);
        assert_eq!(names(&out), vec!["b"]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let scored = vec![c("x", 0.5), c("y", 0.7), c("z", 0.5), c("w", 0.7)];
        let out = select(scored, 0.9, 10, ThresholdBoundary::Exclude);
        assert_eq!(names(&out), vec!["y", "w", "x", "z"]);
    }

    #[test]
    fn boundary_policy_controls_equal_scores() {
        let scored = || vec![c("low", 0.2), c("edge", 0.9), c("high", 0.95)];

        let excluded = partition(scored(), 0.9, ThresholdBoundary::Exclude);
        assert_eq!(names(&excluded.above), vec!["high"]);
        assert_eq!(names(&excluded.below), vec!["low"]);

        let above = partition(scored(), 0.9, ThresholdBoundary::Above);
        assert_eq!(names(&above.above), vec!["high", "edge"]);

        let below = partition(scored(), 0.9, ThresholdBoundary::Below);
        assert_eq!(names(&below.below), vec!["edge", "low"]);

        assert!(!ThresholdBoundary::Exclude.admits(0.9, 0.9));
        assert!(!ThresholdBoundary::Below.admits(0.9, 0.9));
        assert!(ThresholdBoundary::Above.admits(0.9, 0.9));
        assert!(ThresholdBoundary::Exclude.admits(0.901, 0.9));
    }

    #[test]
    fn top_k_truncates() {
        let scored = (0..10).map(|i| c(&format!("n{i}"), f64::from(i) / 10.0)).collect();
        let out = select(scored, 0.55, 3, ThresholdBoundary::Exclude);
        assert_eq!(names(&out), vec!["n9", "n8", "n7"]);
    }

    fn ranker() -> SemanticRanker {
        SemanticRanker::new(
            SimilarityMethod::Cosine,
            Arc::new(HashingEmbedder::default()),
        )
    }

    #[test]
    fn empty_query_or_candidates_yield_nothing() {
        let ranker = ranker();
        let sets = vec![SynonymSet::new("HeLa", vec![])];
        assert!(ranker.rank("   ", &sets, 0.5, 5).unwrap().is_empty());
        assert!(ranker.rank("hela", &[], 0.5, 5).unwrap().is_empty());
        assert!(ranker.rank("hela", &sets, 0.5, 0).unwrap().is_empty());
    }

    #[test]
    fn score_is_max_over_synonyms_including_canonical_name() {
        let ranker = ranker();
        let sets = vec![
            SynonymSet::new("Jurkat", vec!["JM".to_string()]),
            SynonymSet::new("MCF-7", vec!["Michigan Cancer Foundation-7".to_string()]),
        ];
        let out = ranker.rank("  mcf-7 ", &sets, 0.9, 5).unwrap();
        assert_eq!(out[0].canonical_name, "MCF-7");
        assert_eq!(out[0].score, 1.0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let ranker = ranker();
        let sets = vec![SynonymSet::new("HeLa", vec!["HeLa CCL-2".to_string()])];
        let first = ranker.rank("hela", &sets, 0.9, 5).unwrap();
        let second = ranker.rank("hela", &sets, 0.9, 5).unwrap();
        assert_eq!(first, second);
        let (_, embeddings) = ranker.cache_stats().unwrap();
        // "hela" (query and canonical name share a key) and "hela ccl-2".
        assert_eq!(embeddings.entries, 2);
        assert!(embeddings.hits >= 3);
    }

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn dim(&self) -> usize {
            4
        }

        fn embed(&self, _text: &str) -> Vec<f32> {
            vec![1.0; 3]
        }
    }

    #[test]
    fn dimension_contract_violation_is_a_config_error() {
        let ranker = SemanticRanker::new(SimilarityMethod::Cosine, Arc::new(BrokenEmbedder));
        let sets = vec![SynonymSet::new("HeLa", vec![])];
        let err = ranker.rank("hela", &sets, 0.9, 5).unwrap_err();
        assert!(err.is_config());
    }
}
