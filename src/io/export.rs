//! CSV exports.
//!
//! - the structured table (canonical names, source units) that `train` reads
//! - stage matrices (preprocessed / selected) with the target appended, for
//!   inspection in spreadsheets or downstream scripts

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{FeatureMatrix, FieldKind, ID_FIELD, InputField, StructuredRecord, TARGET_FIELD, TARGET_KIND};
use crate::error::AppError;

/// Write records as a structured CSV at `path`.
pub fn write_structured_csv(path: &Path, records: &[StructuredRecord]) -> Result<(), AppError> {
    let file = create(path)?;
    write_structured(file, records)
}

/// Write records as structured CSV to any writer.
///
/// Values are denormalized back to source units so the file reads like the
/// atlas it came from and re-ingests to the same records.
pub fn write_structured<W: Write>(writer: W, records: &[StructuredRecord]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![ID_FIELD];
    header.extend(InputField::ALL.iter().map(|f| f.name()));
    header.push(TARGET_FIELD);
    wtr.write_record(&header).map_err(write_err)?;

    for r in records {
        let mut row = Vec::with_capacity(header.len());
        row.push(r.fips.clone().unwrap_or_default());
        for field in InputField::ALL {
            row.push(source_cell(field.kind(), r.get(field)));
        }
        row.push(source_cell(TARGET_KIND, r.obesity_percentage_2017));
        wtr.write_record(&row).map_err(write_err)?;
    }

    wtr.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV: {e}")))
}

/// Write a stage matrix with an optional target column.
pub fn write_matrix_csv(
    path: &Path,
    matrix: &FeatureMatrix,
    targets: Option<&[f64]>,
) -> Result<(), AppError> {
    if let Some(t) = targets {
        if t.len() != matrix.nrows() {
            return Err(AppError::new(
                2,
                format!("{} target(s) for {} matrix row(s)", t.len(), matrix.nrows()),
            ));
        }
    }

    let mut wtr = csv::Writer::from_writer(create(path)?);

    let mut header: Vec<&str> = matrix.fields().iter().map(String::as_str).collect();
    if targets.is_some() {
        header.push(TARGET_FIELD);
    }
    wtr.write_record(&header).map_err(write_err)?;

    for i in 0..matrix.nrows() {
        let mut row: Vec<String> = matrix.data().row(i).iter().map(f64::to_string).collect();
        if let Some(t) = targets {
            row.push(t[i].to_string());
        }
        wtr.write_record(&row).map_err(write_err)?;
    }

    wtr.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))
}

fn create(path: &Path) -> Result<File, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::new(2, format!("Failed to create directory '{}': {e}", parent.display()))
        })?;
    }
    File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))
}

/// Source-unit cell text. Non-percentage values are written exactly.
fn source_cell(kind: FieldKind, value: Option<f64>) -> String {
    value
        .map(|v| {
            let v = kind.denormalize(v);
            // x100 can leave noise in the last bits (12.340000000000002).
            let v = if kind == FieldKind::Percentage { (v * 1e10).round() / 1e10 } else { v };
            if v == 0.0 { "0".to_string() } else { v.to_string() }
        })
        .unwrap_or_default()
}

fn write_err(e: csv::Error) -> AppError {
    AppError::new(2, format!("Failed to write CSV row: {e}"))
}
