//! Deterministic lexical matching tier.
//!
//! Binary match / no-match over the reference index: exact lookup first,
//! then first-hit synonym containment. No scoring.

use crate::index::ReferenceIndex;
use crate::record::CanonicalRecord;

/// How a lexical hit was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalKind {
    /// Equal to canonical name, controlled name or accession.
    Exact,
    /// Contained in a listed synonym.
    Substring,
}

/// A lexical hit and the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexicalHit<'a> {
    /// Matched reference record.
    pub record: &'a CanonicalRecord,
    /// Matching rule.
    pub kind: LexicalKind,
}

/// Resolves a label against the index, reporting which rule matched.
#[must_use]
pub fn resolve_with_kind<'a>(label: &str, index: &'a ReferenceIndex) -> Option<LexicalHit<'a>> {
    if let Some(record) = index.lookup_exact(label) {
        return Some(LexicalHit {
            record,
            kind: LexicalKind::Exact,
        });
    }
    index.lookup_substring(label).map(|record| LexicalHit {
        record,
        kind: LexicalKind::Substring,
    })
}

/// Resolves a label against the index.
#[must_use]
pub fn resolve<'a>(label: &str, index: &'a ReferenceIndex) -> Option<&'a CanonicalRecord> {
    resolve_with_kind(label, index).map(|hit| hit.record)
}
