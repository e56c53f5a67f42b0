//! Read/write the training report JSON.
//!
//! The report is the human-auditable companion to the binary artifacts:
//! counts, the selected fields with their scores, and held-out metrics.

use std::fs::File;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Write any serializable report as pretty JSON.
pub fn write_report_json<T: Serialize>(path: &Path, report: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::new(2, format!("Failed to create directory '{}': {e}", parent.display()))
        })?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))
}

pub fn read_report_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tiny {
        k: usize,
        fields: Vec<String>,
    }

    #[test]
    fn writes_pretty_json_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/training.json");
        let report = Tiny {
            k: 2,
            fields: vec!["a".into(), "b".into()],
        };
        write_report_json(&path, &report).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"k\": 2"));
        let back: Tiny = read_report_json(&path).unwrap();
        assert_eq!(back, report);
    }
}
