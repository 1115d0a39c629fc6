//! Tab-separated table sources and sink.
//!
//! Tables are read fully into memory before resolution starts, and the output
//! is rendered into a buffer and written in one go, so a failed run never
//! leaves a partial output file behind.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::info;

use crate::error::CellmapResult;
use crate::record::{parse_synonyms, AnnotatedRow, CanonicalRecord, QueryLabel};
use crate::schema::{
    normalize_header, reference_columns, ColumnMap, CELLOSAURUS_ACCESSION, CELLOSAURUS_NAME,
    CELL_LINE, CHARACTERISTICS_CELL_LINE, OUTPUT_COLUMNS, QUERY_COLUMNS,
    REFERENCE_IDENTITY_COLUMNS, SOURCE_NAME, SYNONYMS,
};

/// Table name used in schema errors for the input table.
pub const QUERY_TABLE: &str = "SDRF";
/// Table name used in schema errors for the reference table.
pub const REFERENCE_TABLE: &str = "cell line database";

const DELIMITER: u8 = b'\t';

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(source)
}

fn field<'r>(record: &'r StringRecord, map: &ColumnMap, column: &str) -> &'r str {
    map.position(column)
        .and_then(|pos| record.get(pos))
        .unwrap_or("")
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

/// Reads query labels from a tab-separated source.
///
/// # Errors
///
/// Returns a schema error if `source name` or `characteristics[cell line]`
/// is missing, or a table error on malformed input.
pub fn read_query_labels<R: Read>(source: R) -> CellmapResult<Vec<QueryLabel>> {
    let mut rdr = reader(source);
    let headers = rdr.headers()?.clone();
    let map = ColumnMap::resolve(QUERY_TABLE, headers.iter(), &QUERY_COLUMNS)?;

    let mut labels = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if is_blank(&record) {
            continue;
        }
        labels.push(QueryLabel::new(
            field(&record, &map, SOURCE_NAME),
            field(&record, &map, CHARACTERISTICS_CELL_LINE),
        ));
    }
    Ok(labels)
}

/// Reads reference records from a tab-separated source, in source order.
///
/// Every column other than the four identity columns is kept as a
/// descriptive attribute.
///
/// # Errors
///
/// Returns a schema error if any identity or descriptive column is missing,
/// or a table error on malformed input.
pub fn read_reference<R: Read>(source: R) -> CellmapResult<Vec<CanonicalRecord>> {
    let mut rdr = reader(source);
    let headers = rdr.headers()?.clone();
    let map = ColumnMap::resolve(REFERENCE_TABLE, headers.iter(), &reference_columns())?;

    let attribute_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (idx, normalize_header(name)))
        .filter(|(idx, name)| {
            !name.is_empty()
                && !REFERENCE_IDENTITY_COLUMNS.contains(&name.as_str())
                && map.position(name) == Some(*idx)
        })
        .collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if is_blank(&record) {
            continue;
        }
        let mut canonical = CanonicalRecord::new(
            field(&record, &map, CELL_LINE).trim(),
            field(&record, &map, CELLOSAURUS_NAME).trim(),
            field(&record, &map, CELLOSAURUS_ACCESSION).trim(),
        );
        canonical.synonyms = parse_synonyms(field(&record, &map, SYNONYMS));
        for (idx, name) in &attribute_columns {
            let value = record.get(*idx).unwrap_or("").trim();
            canonical.attributes.insert(name.clone(), value.to_string());
        }
        records.push(canonical);
    }
    Ok(records)
}

/// Writes annotated rows as a tab-separated table with the fixed output header.
///
/// The header is written even when there are no rows.
///
/// # Errors
///
/// Returns a table error if serialization or the underlying writer fails.
pub fn write_annotated<W: Write>(sink: W, rows: &[AnnotatedRow]) -> CellmapResult<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .from_writer(sink);
    wtr.write_record(OUTPUT_COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads the input table from `path`.
///
/// # Errors
///
/// See [`read_query_labels`]; also returns an IO error if the file cannot be opened.
pub fn read_query_file(path: &Path) -> CellmapResult<Vec<QueryLabel>> {
    info!("Loading SDRF file: {}", path.display());
    let labels = read_query_labels(fs::File::open(path)?)?;
    info!(rows = labels.len(), "SDRF file loaded");
    Ok(labels)
}

/// Reads the reference table from `path`.
///
/// # Errors
///
/// See [`read_reference`]; also returns an IO error if the file cannot be opened.
pub fn read_reference_file(path: &Path) -> CellmapResult<Vec<CanonicalRecord>> {
    info!("Loading cell line database: {}", path.display());
    let records = read_reference(fs::File::open(path)?)?;
    info!(records = records.len(), "cell line database loaded");
    Ok(records)
}

/// Renders rows in memory, then writes them to `path` in a single call.
///
/// # Errors
///
/// Returns a table or IO error if rendering or writing fails.
pub fn write_annotated_file(path: &Path, rows: &[AnnotatedRow]) -> CellmapResult<()> {
    let mut buf = Vec::new();
    write_annotated(&mut buf, rows)?;
    info!("Saving annotated data to: {}", path.display());
    fs::write(path, buf)?;
    Ok(())
}
