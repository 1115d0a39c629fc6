//! Column names and header validation for the input, reference and output tables.
//!
//! Header cells are matched case-insensitively after trimming. A missing
//! required column is a fatal [`SchemaError`] raised at load time, listing
//! every absent column at once rather than failing on the first.

use std::collections::HashMap;

use crate::error::SchemaError;

/// Input table: pass-through key.
pub const SOURCE_NAME: &str = "source name";
/// Input table: the free-text label to resolve.
pub const CHARACTERISTICS_CELL_LINE: &str = "characteristics[cell line]";

/// Reference table: canonical cell line name.
pub const CELL_LINE: &str = "cell line";
/// Reference table: controlled secondary name.
pub const CELLOSAURUS_NAME: &str = "cellosaurus name";
/// Reference table: stable accession.
pub const CELLOSAURUS_ACCESSION: &str = "cellosaurus accession";
/// Reference table: `;`-delimited synonym list.
pub const SYNONYMS: &str = "synonyms";

/// Separator between synonyms inside a single `synonyms` cell.
pub const SYNONYM_SEPARATOR: char = ';';

/// Literal written for every attribute that cannot be resolved.
pub const NOT_AVAILABLE: &str = "not available";

/// Descriptive attributes carried from the reference table into the output.
pub const DESCRIPTIVE_COLUMNS: [&str; 11] = [
    "bto cell line",
    "organism",
    "organism part",
    "sampling site",
    "age",
    "developmental stage",
    "sex",
    "ancestry category",
    "disease",
    "cell type",
    "material type",
];

/// Columns the input table must expose.
pub const QUERY_COLUMNS: [&str; 2] = [SOURCE_NAME, CHARACTERISTICS_CELL_LINE];

/// Identity columns the reference table must expose.
pub const REFERENCE_IDENTITY_COLUMNS: [&str; 4] =
    [CELL_LINE, CELLOSAURUS_NAME, CELLOSAURUS_ACCESSION, SYNONYMS];

/// Output header, in write order.
pub const OUTPUT_COLUMNS: [&str; 16] = [
    SOURCE_NAME,
    CHARACTERISTICS_CELL_LINE,
    CELL_LINE,
    CELLOSAURUS_NAME,
    CELLOSAURUS_ACCESSION,
    "bto cell line",
    "organism",
    "organism part",
    "sampling site",
    "age",
    "developmental stage",
    "sex",
    "ancestry category",
    "disease",
    "cell type",
    "material type",
];

/// Every column the reference table must expose.
#[must_use]
pub fn reference_columns() -> Vec<&'static str> {
    REFERENCE_IDENTITY_COLUMNS
        .iter()
        .chain(DESCRIPTIVE_COLUMNS.iter())
        .copied()
        .collect()
}

/// Normalizes a header cell for case-insensitive matching.
#[must_use]
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Maps normalized column names to positions in a header row.
///
/// When a name repeats, the first occurrence wins.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    positions: HashMap<String, usize>,
}

impl ColumnMap {
    /// Builds a column map from header cells, then checks `required` against it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingHeader`] for an empty header and
    /// [`SchemaError::MissingColumns`] listing every absent required column.
    pub fn resolve<'h, I>(table: &str, header: I, required: &[&str]) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = &'h str>,
    {
        let mut positions = HashMap::new();
        for (idx, name) in header.into_iter().enumerate() {
            let key = normalize_header(name);
            if key.is_empty() {
                continue;
            }
            positions.entry(key).or_insert(idx);
        }

        if positions.is_empty() {
            return Err(SchemaError::MissingHeader {
                table: table.to_string(),
            });
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|col| !positions.contains_key(&normalize_header(col)))
            .map(|col| (*col).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns {
                table: table.to_string(),
                columns: missing,
            });
        }

        Ok(Self { positions })
    }

    /// Position of `column`, if the header has it.
    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(&normalize_header(column)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_matching_is_case_insensitive() {
        let header = ["Source Name", "Characteristics[Cell Line]", "comment[data file]"];
        let map = ColumnMap::resolve("SDRF", header, &QUERY_COLUMNS).unwrap();
        assert_eq!(map.position(SOURCE_NAME), Some(0));
        assert_eq!(map.position(CHARACTERISTICS_CELL_LINE), Some(1));
        assert_eq!(map.position("COMMENT[DATA FILE]"), Some(2));
    }

    #[test]
    fn repeated_header_keeps_first_position() {
        let header = ["source name", "characteristics[cell line]", "Characteristics[cell line]"];
        let map = ColumnMap::resolve("SDRF", header, &QUERY_COLUMNS).unwrap();
        assert_eq!(map.position(CHARACTERISTICS_CELL_LINE), Some(1));
    }

    #[test]
    fn every_missing_column_is_reported() {
        let header = ["cell line", "synonyms"];
        let err = ColumnMap::resolve("database", header, &reference_columns()).unwrap_err();
        let SchemaError::MissingColumns { table, columns } = err else {
            panic!("expected missing columns");
        };
        assert_eq!(table, "database");
        assert!(columns.contains(&CELLOSAURUS_NAME.to_string()));
        assert!(columns.contains(&CELLOSAURUS_ACCESSION.to_string()));
        assert!(columns.contains(&"material type".to_string()));
        assert!(!columns.contains(&CELL_LINE.to_string()));
        assert_eq!(columns.len(), 2 + DESCRIPTIVE_COLUMNS.len());
    }

    #[test]
    fn empty_header_is_rejected() {
        let err = ColumnMap::resolve("SDRF", Vec::<&str>::new(), &QUERY_COLUMNS).unwrap_err();
        assert!(matches!(err, SchemaError::MissingHeader { .. }));
    }

    #[test]
    fn output_columns_cover_descriptive_attributes() {
        for col in DESCRIPTIVE_COLUMNS {
            assert!(OUTPUT_COLUMNS.contains(&col));
        }
        assert_eq!(OUTPUT_COLUMNS.len(), 5 + DESCRIPTIVE_COLUMNS.len());
    }
}
