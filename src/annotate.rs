//! Resolution orchestrator.
//!
//! Two decoupled passes over the input:
//!
//! 1. **Lexical pass**: every label goes through the lexical resolver and
//!    yields exactly one [`AnnotatedRow`], either from the matched record or a
//!    sentinel placeholder.
//! 2. **Semantic pass**: each *distinct* unresolved label (first-seen order)
//!    is ranked once against every synonym set. The result is advisory only:
//!    it is logged and returned as a [`Suggestion`] but never rewrites a row.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::AnnotatorConfig;
use crate::error::CellmapResult;
use crate::index::ReferenceIndex;
use crate::lexical::{self, LexicalKind};
use crate::ranker::{Candidate, SemanticRanker};
use crate::record::{AnnotatedRow, CanonicalRecord, QueryLabel};

/// Which tier resolved a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// Exact or substring string match.
    Lexical,
    /// Embedding similarity above threshold.
    Semantic,
}

/// Outcome of resolving one label.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// A single best record. Lexical hits carry no score; semantic hits
    /// always carry a score that passed the threshold.
    Resolved {
        /// Matched reference record.
        record: CanonicalRecord,
        /// Tier that produced the match.
        tier: MatchTier,
        /// Similarity score, semantic tier only.
        score: Option<f64>,
    },
    /// No confident match; candidates are below-threshold filler or empty.
    Unresolved {
        /// Ranked shortlist for operator review.
        candidates: Vec<Candidate>,
    },
}

impl MatchResult {
    /// Returns true if a record was found.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Semantic-pass output for one distinct unresolved label.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// The raw label as it appeared in the input.
    pub label: String,
    /// Full ranked shortlist (confident matches first).
    pub candidates: Vec<Candidate>,
    /// Best semantic outcome.
    pub outcome: MatchResult,
}

/// Output of a full run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    /// One row per input label, in input order.
    pub rows: Vec<AnnotatedRow>,
    /// Distinct labels with no lexical match, in first-seen order.
    pub unresolved: Vec<String>,
    /// Semantic-pass shortlists, parallel to `unresolved` when the pass ran.
    pub suggestions: Vec<Suggestion>,
}

/// Drives labels through the lexical and semantic tiers.
#[derive(Debug)]
pub struct Annotator<'a> {
    index: &'a ReferenceIndex,
    ranker: Option<&'a SemanticRanker>,
    config: &'a AnnotatorConfig,
}

impl<'a> Annotator<'a> {
    /// Creates an annotator. Without a ranker only the lexical pass runs.
    #[must_use]
    pub fn new(
        index: &'a ReferenceIndex,
        ranker: Option<&'a SemanticRanker>,
        config: &'a AnnotatorConfig,
    ) -> Self {
        Self {
            index,
            ranker,
            config,
        }
    }

    /// Resolves one label through the lexical tier only.
    #[must_use]
    pub fn resolve_lexical(&self, label: &str) -> Option<&'a CanonicalRecord> {
        lexical::resolve(label, self.index)
    }

    /// Resolves one label through the semantic tier, returning the outcome and
    /// the full shortlist.
    ///
    /// # Errors
    ///
    /// Propagates ranker failures (provider contract violations, poisoned caches).
    pub fn resolve_semantic(
        &self,
        ranker: &SemanticRanker,
        label: &str,
    ) -> CellmapResult<(MatchResult, Vec<Candidate>)> {
        let candidates = ranker.rank(
            label,
            self.index.all_synonym_sets(),
            self.config.threshold,
            self.config.top_k,
        )?;

        let confident = candidates
            .first()
            .filter(|best| ranker.boundary().admits(best.score, self.config.threshold));

        let outcome = match confident.and_then(|best| self.index.get(&best.canonical_name)) {
            Some(record) => MatchResult::Resolved {
                record: record.clone(),
                tier: MatchTier::Semantic,
                score: confident.map(|best| best.score),
            },
            None => MatchResult::Unresolved {
                candidates: candidates.clone(),
            },
        };
        Ok((outcome, candidates))
    }

    /// Resolves one label through both tiers: lexical first, then semantic.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve_semantic`].
    pub fn resolve(&self, label: &str) -> CellmapResult<MatchResult> {
        if let Some(record) = self.resolve_lexical(label) {
            return Ok(MatchResult::Resolved {
                record: record.clone(),
                tier: MatchTier::Lexical,
                score: None,
            });
        }
        match self.ranker {
            Some(ranker) => Ok(self.resolve_semantic(ranker, label)?.0),
            None => Ok(MatchResult::Unresolved {
                candidates: Vec::new(),
            }),
        }
    }

    /// Annotates every label and runs the semantic pass over distinct misses.
    ///
    /// # Errors
    ///
    /// Only the semantic pass can fail; see [`Self::resolve_semantic`].
    pub fn annotate(&self, labels: &[QueryLabel]) -> CellmapResult<Annotation> {
        let mut annotation = Annotation {
            rows: Vec::with_capacity(labels.len()),
            ..Annotation::default()
        };
        let mut seen: HashSet<&str> = HashSet::new();
        let mut resolved = 0usize;

        for query in labels {
            match lexical::resolve_with_kind(&query.raw_label, self.index) {
                Some(hit) => {
                    debug!(
                        label = %query.raw_label,
                        cell_line = %hit.record.canonical_name,
                        exact = hit.kind == LexicalKind::Exact,
                        "lexical match"
                    );
                    annotation.rows.push(AnnotatedRow::resolved(query, hit.record));
                    resolved += 1;
                }
                None => {
                    warn!("No match found for cell line: {}", query.raw_label);
                    annotation.rows.push(AnnotatedRow::unresolved(
                        query,
                        self.config.echo_unresolved_label,
                    ));
                    if seen.insert(query.raw_label.as_str()) {
                        annotation.unresolved.push(query.raw_label.clone());
                    }
                }
            }
        }

        info!(
            rows = annotation.rows.len(),
            resolved,
            distinct_unresolved = annotation.unresolved.len(),
            "lexical pass complete"
        );

        if annotation.unresolved.is_empty() {
            return Ok(annotation);
        }
        warn!("Unknown cell lines: {}", annotation.unresolved.join(", "));

        let Some(ranker) = self.ranker.filter(|_| self.config.semantic_pass) else {
            return Ok(annotation);
        };

        for label in &annotation.unresolved {
            let (outcome, candidates) = self.resolve_semantic(ranker, label)?;
            match &outcome {
                MatchResult::Resolved {
                    record,
                    score: Some(score),
                    ..
                } => {
                    info!(
                        "Match found for cell line: {label} - {} (score {score:.3})",
                        record.canonical_name
                    );
                }
                _ => match candidates.first() {
                    Some(best) => warn!(
                        best_candidate = %best.canonical_name,
                        best_score = best.score,
                        "No match found for cell line: {label}"
                    ),
                    None => warn!("No match found for cell line: {label}"),
                },
            }
            annotation.suggestions.push(Suggestion {
                label: label.clone(),
                candidates,
                outcome,
            });
        }

        if let Ok((normalized, embeddings)) = ranker.cache_stats() {
            debug!(
                normalize_hits = normalized.hits,
                normalize_misses = normalized.misses,
                embedding_hits = embeddings.hits,
                embedding_misses = embeddings.misses,
                "semantic pass cache statistics"
            );
        }

        Ok(annotation)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    use crate::embedding::HashingEmbedder;
    use crate::ranker::SimilarityMethod;
    use crate::schema::NOT_AVAILABLE;

    fn index() -> ReferenceIndex {
        ReferenceIndex::build(vec![
            CanonicalRecord::new("HeLa", "HeLa", "CVCL_0030")
                .with_synonym_cell("Henrietta Lacks cells")
                .with_attribute("organism", "Homo sapiens"),
            CanonicalRecord::new("MCF-7", "MCF-7", "CVCL_0031")
                .with_synonym_cell("Michigan Cancer Foundation-7")
                .with_attribute("organism", "Homo sapiens"),
        ])
    }

    fn ranker() -> SemanticRanker {
        SemanticRanker::new(SimilarityMethod::Cosine, Arc::new(HashingEmbedder::default()))
    }

    fn labels(raw: &[&str]) -> Vec<QueryLabel> {
        raw.iter()
            .enumerate()
            .map(|(i, l)| QueryLabel::new(format!("sample {i}"), *l))
            .collect()
    }

    #[test]
    fn lexical_hits_are_annotated_from_the_record() {
        let index = index();
        let config = AnnotatorConfig::default();
        let annotator = Annotator::new(&index, None, &config);
        let out = annotator.annotate(&labels(&["hela", "cvcl_0031", "Henrietta Lacks"])).unwrap();
        assert_eq!(out.rows.len(), 3);
        assert_eq!(out.rows[0].cell_line, "HeLa");
        assert_eq!(out.rows[1].cell_line, "MCF-7");
        assert_eq!(out.rows[2].cellosaurus_accession, "CVCL_0030");
        assert_eq!(out.rows[2].organism, "Homo sapiens");
        assert!(out.unresolved.is_empty());
        assert!(out.suggestions.is_empty());
    }

    #[test]
    fn single_label_resolution_reports_the_tier() {
        let index = index();
        let ranker = ranker();
        let config = AnnotatorConfig {
            threshold: 0.5,
            ..AnnotatorConfig::default()
        };
        let annotator = Annotator::new(&index, Some(&ranker), &config);

        let MatchResult::Resolved { record, tier, score } = annotator.resolve("HELA").unwrap() else {
            panic!("expected lexical match");
        };
        assert_eq!(record.accession, "CVCL_0030");
        assert_eq!(tier, MatchTier::Lexical);
        assert_eq!(score, None);

        let MatchResult::Resolved { tier, score, .. } = annotator.resolve("mcf 7").unwrap() else {
            panic!("expected semantic match");
        };
        assert_eq!(tier, MatchTier::Semantic);
        assert!(score.is_some_and(|s| s > 0.5));

        let lexical_only = Annotator::new(&index, None, &config);
        assert_eq!(
            lexical_only.resolve("mcf 7").unwrap(),
            MatchResult::Unresolved { candidates: vec![] }
        );
    }

    #[test]
    fn misses_are_deduplicated_in_first_seen_order() {
        let index = index();
        let ranker = ranker();
        let config = AnnotatorConfig::default();
        let annotator = Annotator::new(&index, Some(&ranker), &config);
        let out = annotator
            .annotate(&labels(&["XYZ-unknown-999", "hela", "abc", "XYZ-unknown-999"]))
            .unwrap();
        assert_eq!(out.rows.len(), 4);
        assert_eq!(out.unresolved, vec!["XYZ-unknown-999", "abc"]);
        assert_eq!(out.suggestions.len(), 2);
        assert_eq!(out.suggestions[0].label, "XYZ-unknown-999");
        for idx in [0, 2, 3] {
            assert!(out.rows[idx].descriptive_values().iter().all(|v| *v == NOT_AVAILABLE));
        }
    }

    #[test]
    fn semantic_pass_never_rewrites_rows() {
        let index = index();
        let ranker = ranker();
        let config = AnnotatorConfig {
            threshold: 0.5,
            ..AnnotatorConfig::default()
        };
        let annotator = Annotator::new(&index, Some(&ranker), &config);
        // "MCF 7" misses lexically ("mcf 7" is neither a key nor inside a synonym)
        // but is a near-identical spelling of the canonical name.
        let out = annotator.annotate(&labels(&["MCF 7"])).unwrap();
        assert_eq!(out.rows[0].cell_line, NOT_AVAILABLE);
        let suggestion = &out.suggestions[0];
        let MatchResult::Resolved { record, tier, score } = &suggestion.outcome else {
            panic!("expected a semantic match, got {:?}", suggestion.outcome);
        };
        assert_eq!(record.canonical_name, "MCF-7");
        assert_eq!(*tier, MatchTier::Semantic);
        assert!(score.unwrap() > 0.5);
    }

    #[test]
    fn semantic_pass_can_be_disabled() {
        let index = index();
        let ranker = ranker();
        let config = AnnotatorConfig {
            semantic_pass: false,
            ..AnnotatorConfig::default()
        };
        let annotator = Annotator::new(&index, Some(&ranker), &config);
        let out = annotator.annotate(&labels(&["nothing like it"])).unwrap();
        assert_eq!(out.unresolved.len(), 1);
        assert!(out.suggestions.is_empty());
    }

    #[test]
    fn unresolved_outcome_keeps_filler_candidates() {
        let index = index();
        let ranker = ranker();
        let config = AnnotatorConfig {
            threshold: 1.0,
            top_k: 1,
            ..AnnotatorConfig::default()
        };
        let annotator = Annotator::new(&index, Some(&ranker), &config);
        let (outcome, candidates) = annotator.resolve_semantic(&ranker, "jurkat").unwrap();
        assert!(!outcome.is_resolved());
        assert!(candidates.len() <= 1);
        assert_eq!(outcome, MatchResult::Unresolved { candidates });
    }

    #[test]
    fn echo_option_writes_label_into_cell_line() {
        let index = index();
        let config = AnnotatorConfig {
            echo_unresolved_label: true,
            ..AnnotatorConfig::default()
        };
        let annotator = Annotator::new(&index, None, &config);
        let out = annotator.annotate(&labels(&["XYZ-unknown-999"])).unwrap();
        assert_eq!(out.rows[0].cell_line, "XYZ-unknown-999");
        assert_eq!(out.rows[0].organism, NOT_AVAILABLE);
    }
}
