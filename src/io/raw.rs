//! Raw atlas structuring.
//!
//! Selects the modeled columns from a raw Food Environment Atlas export,
//! renames them to canonical names and drops State/County. Values pass
//! through the same range checks and normalization as structured ingest.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::{ID_FIELD, InputField, TARGET_RAW_COLUMN};
use crate::error::AppError;
use crate::io::ingest::{HeaderMap, IngestedData, RowColumns, csv_reader, read_rows};

pub fn load_raw(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open raw CSV '{}': {e}", path.display())))?;
    structure_raw(file)
}

/// Structure a raw atlas CSV into canonical records.
pub fn structure_raw<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read raw CSV headers: {e}")))?
        .clone();
    let columns = raw_columns(&HeaderMap::new(&headers))?;
    Ok(read_rows(&mut reader, headers.len(), &columns))
}

/// Map the raw atlas header onto canonical positions. Other columns are ignored.
fn raw_columns(header_map: &HeaderMap) -> Result<RowColumns, AppError> {
    let id = header_map.require(ID_FIELD)?;
    let mut inputs = [0usize; 9];
    for (slot, field) in inputs.iter_mut().zip(InputField::ALL) {
        *slot = header_map.require(field.raw_column())?;
    }
    Ok(RowColumns {
        id: Some(id),
        inputs,
        input_names: InputField::ALL.map(InputField::raw_column),
        target: header_map.require(TARGET_RAW_COLUMN)?,
        target_name: TARGET_RAW_COLUMN,
    })
}
