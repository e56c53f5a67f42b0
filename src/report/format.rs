//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting/inference code stays clean and testable
//! - output changes are localized

use std::path::PathBuf;

use crate::domain::TARGET_FIELD;
use crate::fit::{RegressionMetrics, TrainingReport};
use crate::io::ingest::{IngestedData, RowError};

/// How many row errors to list before summarizing the rest.
const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Dataset counts + row-error ledger for an ingest.
pub fn format_ingest_summary(label: &str, ingest: &IngestedData) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{label}: rows read={} | used={} | rejected={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    out.push_str(&format_row_errors(&ingest.row_errors));
    out
}

fn format_row_errors(errors: &[RowError]) -> String {
    let mut out = String::new();
    for e in errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
        out.push_str(&format!(
            "  line {:>5} {:<8} {}\n",
            e.line,
            e.id.as_deref().unwrap_or("-"),
            e.message
        ));
    }
    if errors.len() > MAX_ROW_ERRORS_SHOWN {
        out.push_str(&format!("  ... {} more\n", errors.len() - MAX_ROW_ERRORS_SHOWN));
    }
    out
}

/// Training run summary: split, selected features, fitted line, metrics.
pub fn format_training_summary(report: &TrainingReport, artifacts: &[PathBuf]) -> String {
    let mut out = String::new();

    out.push_str("=== obp - county obesity predictor: training ===\n");
    out.push_str(&format!(
        "Records: total={} | labeled={} | train={} | test={} (seed={}, test_fraction={})\n",
        report.records_total,
        report.records_labeled,
        report.records_train,
        report.records_test,
        report.split_seed,
        report.test_fraction,
    ));

    out.push_str(&format!("\nSelected features (k={}):\n", report.k));
    out.push_str(
        format!("{:<58} {:>14} {:>12}\n", "field", "F-score", "coef")
            .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<58} {:-<14} {:-<12}\n", "", "", "").trim_end());
    out.push('\n');
    for (f, coef) in report.selected.iter().zip(&report.coefficients) {
        out.push_str(&format!("{:<58} {:>14} {:>12.6}\n", f.name, fmt_score(f.score), coef));
    }
    out.push_str(&format!("{:<58} {:>14} {:>12.6}\n", "(intercept)", "", report.intercept));

    out.push_str("\nMetrics (target in fraction units):\n");
    out.push_str(&format!("- train: {}\n", fmt_metrics(report.train_metrics.as_ref())));
    out.push_str(&format!("- test : {}\n", fmt_metrics(report.test_metrics.as_ref())));

    if !artifacts.is_empty() {
        out.push_str("\nArtifacts:\n");
        for p in artifacts {
            out.push_str(&format!("- {}\n", p.display()));
        }
    }

    out
}

/// One prediction, shown as a percentage like the source data.
pub fn format_prediction(value: f64) -> String {
    format!("{TARGET_FIELD}: {:.2}%", value * 100.0)
}

fn fmt_metrics(m: Option<&RegressionMetrics>) -> String {
    match m {
        Some(m) => format!(
            "n={} RMSE={:.6} MAE={:.6} R2={}",
            m.n,
            m.rmse,
            m.mae,
            m.r2.map(|r| format!("{r:.4}")).unwrap_or_else(|| "n/a".to_string())
        ),
        None => "n/a".to_string(),
    }
}

fn fmt_score(score: f64) -> String {
    if score >= 1e12 {
        format!("{score:.3e}")
    } else {
        format!("{score:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::SelectedFeature;
    use chrono::Utc;

    fn report() -> TrainingReport {
        TrainingReport {
            created_at: Utc::now(),
            records_total: 50,
            records_labeled: 48,
            records_train: 38,
            records_test: 10,
            split_seed: 42,
            test_fraction: 0.2,
            k: 1,
            selected: vec![SelectedFeature {
                name: "Obesity_Percentage_2012".to_string(),
                score: f64::MAX,
            }],
            intercept: 0.04,
            coefficients: vec![0.9],
            train_metrics: None,
            test_metrics: Some(RegressionMetrics {
                n: 10,
                rmse: 0.01,
                mae: 0.008,
                r2: None,
            }),
        }
    }

    #[test]
    fn training_summary_lists_features_and_metrics() {
        let text = format_training_summary(&report(), &[PathBuf::from("models/predictor.bin")]);
        assert!(text.contains("train=38 | test=10"));
        assert!(text.contains("Obesity_Percentage_2012"));
        assert!(text.contains("e308"));
        assert!(text.contains("- train: n/a"));
        assert!(text.contains("R2=n/a"));
        assert!(text.contains("models/predictor.bin"));
    }

    #[test]
    fn row_errors_are_capped() {
        let ingest = IngestedData {
            records: Vec::new(),
            row_errors: (0..12)
                .map(|i| RowError {
                    line: i + 2,
                    id: None,
                    message: "bad".to_string(),
                })
                .collect(),
            rows_read: 12,
            rows_used: 0,
        };
        let text = format_ingest_summary("Input", &ingest);
        assert!(text.starts_with("Input: rows read=12 | used=0 | rejected=12"));
        assert!(text.contains("... 2 more"));
    }

    #[test]
    fn prediction_is_shown_as_percent() {
        assert_eq!(format_prediction(0.3125), "Obesity_Percentage_2017: 31.25%");
    }
}
