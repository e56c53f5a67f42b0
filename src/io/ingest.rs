//! Structured CSV ingest.
//!
//! Turns the canonical exchange table (one row per county, header of
//! canonical names, values in source units) into `StructuredRecord`s.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **One normalization rule**, shared with prediction requests

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{ID_FIELD, InputField, StructuredRecord, TARGET_FIELD};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: records + row errors + counts.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub records: Vec<StructuredRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Column lookup for one CSV header row.
pub(crate) struct HeaderMap(HashMap<String, usize>);

impl HeaderMap {
    pub(crate) fn new(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(idx, name)| (normalize_header_name(name), idx))
                .collect(),
        )
    }

    pub(crate) fn require(&self, name: &str) -> Result<usize, AppError> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| AppError::new(2, format!("Missing required column: `{name}`")))
    }

    pub(crate) fn optional(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }
}

/// Load a structured CSV from disk.
pub fn load_structured(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_structured(file)
}

/// Read a structured CSV from any reader.
pub fn read_structured<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = HeaderMap::new(&headers);

    let mut inputs = [0usize; 9];
    for (slot, field) in inputs.iter_mut().zip(InputField::ALL) {
        *slot = header_map.require(field.name())?;
    }
    let columns = RowColumns {
        id: header_map.optional(ID_FIELD),
        inputs,
        input_names: InputField::ALL.map(InputField::name),
        target: header_map.require(TARGET_FIELD)?,
        target_name: TARGET_FIELD,
    };
    Ok(read_rows(&mut reader, headers.len(), &columns))
}

/// Where the id, inputs and target live in one particular header layout.
pub(crate) struct RowColumns {
    pub(crate) id: Option<usize>,
    pub(crate) inputs: [usize; 9],
    /// Column names as they appear in the file, for error messages.
    pub(crate) input_names: [&'static str; 9],
    pub(crate) target: usize,
    pub(crate) target_name: &'static str,
}

pub(crate) fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    // Ragged rows are reported per row instead of aborting the whole file.
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Parse every data row, keeping good records and a ledger of bad rows.
pub(crate) fn read_rows<R: Read>(
    reader: &mut csv::Reader<R>,
    header_len: usize,
    columns: &RowColumns,
) -> IngestedData {
    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let id = columns
            .id
            .and_then(|c| record.get(c))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if record.len() != header_len {
            row_errors.push(RowError {
                line,
                id,
                message: format!("expected {header_len} fields, got {}", record.len()),
            });
            continue;
        }

        match parse_row(&record, columns, id.clone()) {
            Ok(r) => records.push(r),
            Err(message) => row_errors.push(RowError { line, id, message }),
        }
    }

    let rows_used = records.len();
    IngestedData {
        records,
        row_errors,
        rows_read,
        rows_used,
    }
}

fn parse_row(record: &StringRecord, columns: &RowColumns, id: Option<String>) -> Result<StructuredRecord, String> {
    let mut inputs = [None; 9];
    for ((slot, &col), name) in inputs.iter_mut().zip(&columns.inputs).zip(columns.input_names) {
        *slot = parse_cell(cell(record, col, name)?, name)?;
    }
    let target = parse_cell(cell(record, columns.target, columns.target_name)?, columns.target_name)?;
    StructuredRecord::from_source(id, inputs, target).map_err(|e| e.to_string())
}

fn cell<'r>(record: &'r StringRecord, col: usize, column: &str) -> Result<&'r str, String> {
    record
        .get(col)
        .ok_or_else(|| format!("Column `{column}` is absent from the row."))
}

/// Parse one numeric cell in source units.
///
/// Empty, `NA` and `NaN` cells are missing. A trailing `%` is accepted.
fn parse_cell(raw: &str, column: &str) -> Result<Option<f64>, String> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let s = s.strip_suffix('%').unwrap_or(s).trim_end();
    s.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("Invalid number `{raw}` in column `{column}`."))
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}
