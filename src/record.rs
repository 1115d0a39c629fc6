//! Data model: reference records, query labels and annotated output rows.
//!
//! Reference records are loaded once and never mutated by resolution.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::{DESCRIPTIVE_COLUMNS, NOT_AVAILABLE, SYNONYM_SEPARATOR};

/// One row of the reference database.
///
/// `canonical_name` is the primary identity. Descriptive attributes are kept
/// as an opaque map keyed by normalized column name and carried through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    /// Canonical cell line name (`cell line` column).
    pub canonical_name: String,
    /// Controlled secondary name (`cellosaurus name` column).
    pub controlled_name: String,
    /// Stable accession (`cellosaurus accession` column). Empty when absent.
    pub accession: String,
    /// Known synonyms in source order.
    pub synonyms: Vec<String>,
    /// Descriptive attributes (organism, disease, ...).
    pub attributes: BTreeMap<String, String>,
}

impl CanonicalRecord {
    /// Creates a record with no synonyms and no attributes.
    #[must_use]
    pub fn new(
        canonical_name: impl Into<String>,
        controlled_name: impl Into<String>,
        accession: impl Into<String>,
    ) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            controlled_name: controlled_name.into(),
            accession: accession.into(),
            synonyms: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style helper that sets synonyms from a raw `;`-delimited cell.
    #[must_use]
    pub fn with_synonym_cell(mut self, cell: &str) -> Self {
        self.synonyms = parse_synonyms(cell);
        self
    }

    /// Builder-style helper that sets one descriptive attribute.
    #[must_use]
    pub fn with_attribute(mut self, column: &str, value: impl Into<String>) -> Self {
        self.attributes
            .insert(crate::schema::normalize_header(column), value.into());
        self
    }

    /// Value of a descriptive attribute, or `None` when blank or absent.
    #[must_use]
    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes
            .get(&crate::schema::normalize_header(column))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns the synonym set used by the semantic ranker.
    #[must_use]
    pub fn synonym_set(&self) -> SynonymSet {
        SynonymSet::new(self.canonical_name.clone(), self.synonyms.clone())
    }
}

/// Splits a raw synonym cell on `;`, trimming pieces and dropping empty ones.
#[must_use]
pub fn parse_synonyms(cell: &str) -> Vec<String> {
    cell.split(SYNONYM_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A canonical name together with its synonyms.
///
/// The canonical name is always implicitly a synonym of itself; [`Self::terms`]
/// yields it after the listed synonyms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymSet {
    /// Canonical name this set belongs to.
    pub canonical_name: String,
    /// Listed synonyms (excluding the canonical name).
    pub synonyms: Vec<String>,
}

impl SynonymSet {
    /// Creates a synonym set.
    #[must_use]
    pub fn new(canonical_name: impl Into<String>, synonyms: Vec<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            synonyms,
        }
    }

    /// All strings to compare against: listed synonyms, then the canonical name.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.synonyms
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.canonical_name.as_str()))
    }
}

/// One row of the input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLabel {
    /// Pass-through key (`source name`).
    pub source_name: String,
    /// Text to resolve (`characteristics[cell line]`).
    pub raw_label: String,
}

impl QueryLabel {
    /// Creates a query label.
    #[must_use]
    pub fn new(source_name: impl Into<String>, raw_label: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            raw_label: raw_label.into(),
        }
    }
}

/// Final output record: query fields plus every reference attribute.
///
/// Unresolvable attributes hold [`NOT_AVAILABLE`], never an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedRow {
    #[serde(rename = "source name")]
    pub source_name: String,
    #[serde(rename = "characteristics[cell line]")]
    pub raw_label: String,
    #[serde(rename = "cell line")]
    pub cell_line: String,
    #[serde(rename = "cellosaurus name")]
    pub cellosaurus_name: String,
    #[serde(rename = "cellosaurus accession")]
    pub cellosaurus_accession: String,
    #[serde(rename = "bto cell line")]
    pub bto_cell_line: String,
    pub organism: String,
    #[serde(rename = "organism part")]
    pub organism_part: String,
    #[serde(rename = "sampling site")]
    pub sampling_site: String,
    pub age: String,
    #[serde(rename = "developmental stage")]
    pub developmental_stage: String,
    pub sex: String,
    #[serde(rename = "ancestry category")]
    pub ancestry_category: String,
    pub disease: String,
    #[serde(rename = "cell type")]
    pub cell_type: String,
    #[serde(rename = "material type")]
    pub material_type: String,
}

fn or_not_available(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

impl AnnotatedRow {
    /// Builds a row from a matched reference record.
    #[must_use]
    pub fn resolved(query: &QueryLabel, record: &CanonicalRecord) -> Self {
        let attr = |column: &str| or_not_available(record.attribute(column));
        Self {
            source_name: query.source_name.clone(),
            raw_label: query.raw_label.clone(),
            cell_line: or_not_available(Some(&record.canonical_name)),
            cellosaurus_name: or_not_available(Some(&record.controlled_name)),
            cellosaurus_accession: or_not_available(Some(&record.accession)),
            bto_cell_line: attr(DESCRIPTIVE_COLUMNS[0]),
            organism: attr(DESCRIPTIVE_COLUMNS[1]),
            organism_part: attr(DESCRIPTIVE_COLUMNS[2]),
            sampling_site: attr(DESCRIPTIVE_COLUMNS[3]),
            age: attr(DESCRIPTIVE_COLUMNS[4]),
            developmental_stage: attr(DESCRIPTIVE_COLUMNS[5]),
            sex: attr(DESCRIPTIVE_COLUMNS[6]),
            ancestry_category: attr(DESCRIPTIVE_COLUMNS[7]),
            disease: attr(DESCRIPTIVE_COLUMNS[8]),
            cell_type: attr(DESCRIPTIVE_COLUMNS[9]),
            material_type: attr(DESCRIPTIVE_COLUMNS[10]),
        }
    }

    /// Builds the placeholder row for a label with no lexical match.
    ///
    /// With `echo_label`, `cell line` carries the raw label instead of the sentinel.
    #[must_use]
    pub fn unresolved(query: &QueryLabel, echo_label: bool) -> Self {
        let na = || NOT_AVAILABLE.to_string();
        let cell_line = if echo_label {
            or_not_available(Some(&query.raw_label))
        } else {
            na()
        };
        Self {
            source_name: query.source_name.clone(),
            raw_label: query.raw_label.clone(),
            cell_line,
            cellosaurus_name: na(),
            cellosaurus_accession: na(),
            bto_cell_line: na(),
            organism: na(),
            organism_part: na(),
            sampling_site: na(),
            age: na(),
            developmental_stage: na(),
            sex: na(),
            ancestry_category: na(),
            disease: na(),
            cell_type: na(),
            material_type: na(),
        }
    }

    /// Descriptive values in output column order (everything after the two query columns).
    #[must_use]
    pub fn descriptive_values(&self) -> [&str; 14] {
        [
            self.cell_line.as_str(),
            self.cellosaurus_name.as_str(),
            self.cellosaurus_accession.as_str(),
            self.bto_cell_line.as_str(),
            self.organism.as_str(),
            self.organism_part.as_str(),
            self.sampling_site.as_str(),
            self.age.as_str(),
            self.developmental_stage.as_str(),
            self.sex.as_str(),
            self.ancestry_category.as_str(),
            self.disease.as_str(),
            self.cell_type.as_str(),
            self.material_type.as_str(),
        ]
    }
}
