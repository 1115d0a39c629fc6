//! Reference index over canonical cell line records.
//!
//! Records are held as an ordered sequence. Exact lookups go through a
//! normalized-key map built in source order so the first row wins; substring
//! lookups scan records in source order and return the *first* hit, not the
//! best one. That first-hit policy trades precision for predictability and is
//! relied upon by callers, so it must not be replaced with a best-match search.

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::warn;

use crate::record::{CanonicalRecord, SynonymSet};

fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Immutable, read-only index over the reference table.
#[derive(Debug)]
pub struct ReferenceIndex {
    records: Vec<CanonicalRecord>,
    /// Normalized canonical name / controlled name / accession -> first record position.
    by_key: HashMap<String, usize>,
    /// Canonical name (exact) -> first record position.
    by_canonical: HashMap<String, usize>,
    /// Lower-cased synonyms per record, parallel to `records`.
    folded_synonyms: Vec<Vec<String>>,
    synonym_sets: OnceLock<Vec<SynonymSet>>,
}

impl ReferenceIndex {
    /// Builds the index from records in source order.
    ///
    /// Duplicate canonical names or accessions are logged; the first
    /// occurrence keeps the key.
    #[must_use]
    pub fn build(records: Vec<CanonicalRecord>) -> Self {
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut by_canonical: HashMap<String, usize> = HashMap::new();
        let mut seen_accessions: HashMap<String, usize> = HashMap::new();

        for (pos, record) in records.iter().enumerate() {
            if let Some(&first) = by_canonical.get(&record.canonical_name) {
                warn!(
                    canonical_name = %record.canonical_name,
                    first_row = first,
                    duplicate_row = pos,
                    "duplicate canonical name in reference table; keeping first"
                );
            } else {
                by_canonical.insert(record.canonical_name.clone(), pos);
            }

            let accession = normalize_key(&record.accession);
            if !accession.is_empty() {
                if let Some(&first) = seen_accessions.get(&accession) {
                    warn!(
                        accession = %record.accession,
                        first_row = first,
                        duplicate_row = pos,
                        "duplicate accession in reference table; keeping first"
                    );
                } else {
                    seen_accessions.insert(accession, pos);
                }
            }

            for field in [&record.canonical_name, &record.controlled_name, &record.accession] {
                let key = normalize_key(field);
                if !key.is_empty() {
                    by_key.entry(key).or_insert(pos);
                }
            }
        }

        let folded_synonyms = records
            .iter()
            .map(|r| r.synonyms.iter().map(|s| s.to_lowercase()).collect())
            .collect();

        Self {
            records,
            by_key,
            by_canonical,
            folded_synonyms,
            synonym_sets: OnceLock::new(),
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the index holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in source order.
    #[must_use]
    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    /// Record with exactly this canonical name.
    #[must_use]
    pub fn get(&self, canonical_name: &str) -> Option<&CanonicalRecord> {
        self.by_canonical
            .get(canonical_name)
            .map(|&pos| &self.records[pos])
    }

    /// Case-insensitive equality against canonical name, controlled name or accession.
    #[must_use]
    pub fn lookup_exact(&self, text: &str) -> Option<&CanonicalRecord> {
        let key = normalize_key(text);
        if key.is_empty() {
            return None;
        }
        self.by_key.get(&key).map(|&pos| &self.records[pos])
    }

    /// Case-insensitive containment of `text` inside any listed synonym.
    ///
    /// Scans records in source order and returns the first record with a
    /// containing synonym.
    #[must_use]
    pub fn lookup_substring(&self, text: &str) -> Option<&CanonicalRecord> {
        let needle = normalize_key(text);
        if needle.is_empty() {
            return None;
        }
        self.folded_synonyms
            .iter()
            .position(|synonyms| synonyms.iter().any(|s| s.contains(&needle)))
            .map(|pos| &self.records[pos])
    }

    /// Synonym sets for every record, in source order. Built on first use.
    pub fn all_synonym_sets(&self) -> &[SynonymSet] {
        self.synonym_sets
            .get_or_init(|| self.records.iter().map(CanonicalRecord::synonym_set).collect())
    }
}
