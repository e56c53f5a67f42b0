//! Fitted feature selector.
//!
//! Each field is scored by the univariate regression F-statistic against the
//! target:
//!
//! ```text
//! r = Σ(x - x̄)(y - ȳ) / sqrt(Σ(x - x̄)² · Σ(y - ȳ)²)
//! F = r² / (1 - r²) · (n - 2)
//! ```
//!
//! Scores are forced finite: a zero-variance field (or target) scores `0.0`,
//! a perfectly correlated field scores `f64::MAX`. The top `k` fields win;
//! equal scores are broken by original field order. Retained fields keep
//! their original relative order.

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureMatrix, FeatureVector, Stage, TARGET_FIELD, ensure_stage};
use crate::error::PipelineError;
use crate::transform::FittedTransform;

const STAGE: &str = "feature selector";

/// Sums of squares at or below this are treated as zero variance.
const VARIANCE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedFeatureSelector {
    input_fields: Vec<String>,
    /// F-statistic of every input field, aligned with `input_fields`.
    input_scores: Vec<f64>,
    selected: Vec<String>,
    selected_scores: Vec<f64>,
}

impl FittedFeatureSelector {
    /// Score the columns of a preprocessed training matrix and keep the top `k`.
    pub fn fit(x: &FeatureMatrix, y: &[f64], k: usize) -> Result<Self, PipelineError> {
        ensure_stage(STAGE, Stage::Preprocessed, x.stage())?;

        let available = x.ncols();
        if k == 0 || k > available {
            return Err(PipelineError::InvalidK { k, available });
        }
        if y.len() != x.nrows() {
            return Err(PipelineError::schema(
                STAGE,
                format!("{} target value(s) for {} feature row(s)", y.len(), x.nrows()),
            ));
        }
        if x.nrows() < 3 {
            return Err(PipelineError::InsufficientData(format!(
                "feature scoring needs at least 3 records, got {}",
                x.nrows()
            )));
        }
        if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidInput {
                field: TARGET_FIELD.to_string(),
                reason: format!("non-finite target value {bad}"),
            });
        }

        let input_scores: Vec<f64> = (0..available)
            .map(|j| {
                let column: Vec<f64> = x.data().column(j).iter().copied().collect();
                f_statistic(&column, y)
            })
            .collect();

        let mut keep = rank_indices(&input_scores);
        keep.truncate(k);
        keep.sort_unstable();

        let selected = keep.iter().map(|&j| x.fields()[j].clone()).collect();
        let selected_scores = keep.iter().map(|&j| input_scores[j]).collect();

        Ok(Self {
            input_fields: x.fields().to_vec(),
            input_scores,
            selected,
            selected_scores,
        })
    }

    /// Project every row of a preprocessed matrix.
    pub fn transform_matrix(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix, PipelineError> {
        let rows = matrix
            .rows()
            .map(|row| self.transform(&row))
            .collect::<Result<Vec<_>, _>>()?;
        FeatureMatrix::from_vectors(&rows)
    }

    pub fn k(&self) -> usize {
        self.selected.len()
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn selected_scores(&self) -> &[f64] {
        &self.selected_scores
    }

    pub fn input_scores(&self) -> &[f64] {
        &self.input_scores
    }

    /// Structural check for artifacts read back from disk.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.input_scores.len() != self.input_fields.len()
            || self.selected_scores.len() != self.selected.len()
        {
            return Err(PipelineError::Artifact(
                "feature selector scores do not align with its fields".to_string(),
            ));
        }
        if self.selected.is_empty() {
            return Err(PipelineError::Artifact("feature selector retains no fields".to_string()));
        }
        if let Some(f) = self.selected.iter().find(|f| !self.input_fields.contains(f)) {
            return Err(PipelineError::Artifact(format!(
                "retained field `{f}` is not one of the selector's input fields"
            )));
        }
        Ok(())
    }
}

impl FittedTransform for FittedFeatureSelector {
    fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    fn output_fields(&self) -> &[String] {
        &self.selected
    }

    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PipelineError> {
        ensure_stage(STAGE, Stage::Preprocessed, features.stage())?;

        let mut values = Vec::with_capacity(self.selected.len());
        for field in &self.selected {
            let Some(v) = features.get(field) else {
                return Err(PipelineError::schema(
                    STAGE,
                    format!("retained field `{field}` is absent from input"),
                ));
            };
            values.push(v);
        }
        Ok(FeatureVector::from_parts(Stage::Selected, self.selected.clone(), values))
    }
}

/// Univariate regression F-statistic, forced finite.
pub fn f_statistic(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= VARIANCE_EPS || syy <= VARIANCE_EPS {
        return 0.0;
    }

    let r = sxy / (sxx * syy).sqrt();
    let r2 = (r * r).min(1.0);
    let resid = 1.0 - r2;
    if resid <= f64::EPSILON {
        return f64::MAX;
    }
    let f = r2 / resid * (n - 2.0);
    if f.is_finite() { f } else { f64::MAX }
}

/// Column indices ordered by descending score, ties by ascending index.
fn rank_indices(scores: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..scores.len()).collect();
    idx.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn matrix(fields: &[&str], rows: &[&[f64]]) -> FeatureMatrix {
        let data = DMatrix::from_row_iterator(
            rows.len(),
            fields.len(),
            rows.iter().flat_map(|r| r.iter().copied()),
        );
        FeatureMatrix::from_parts(
            Stage::Preprocessed,
            fields.iter().map(|s| s.to_string()).collect(),
            data,
        )
    }

    fn training_set() -> (FeatureMatrix, Vec<f64>) {
        // `strong` tracks y exactly, `weak` loosely, `flat` not at all.
        let x = matrix(
            &["flat", "weak", "strong", "noise"],
            &[
                &[1.0, 0.5, 1.0, 0.3],
                &[1.0, 1.5, 2.0, -0.2],
                &[1.0, 2.5, 3.0, 0.9],
                &[1.0, 3.0, 4.0, -0.4],
                &[1.0, 5.5, 5.0, 0.1],
            ],
        );
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        (x, y)
    }

    #[test]
    fn keeps_top_k_in_original_order() {
        let (x, y) = training_set();
        let sel = FittedFeatureSelector::fit(&x, &y, 2).unwrap();
        assert_eq!(sel.selected(), &["weak".to_string(), "strong".to_string()]);
        assert_eq!(sel.input_scores()[0], 0.0);
        assert_eq!(sel.input_scores()[2], f64::MAX);
    }

    #[test]
    fn selection_is_stable_across_runs() {
        let (x, y) = training_set();
        let first = FittedFeatureSelector::fit(&x, &y, 2).unwrap();
        for _ in 0..20 {
            let again = FittedFeatureSelector::fit(&x, &y, 2).unwrap();
            assert_eq!(again.selected(), first.selected());
            let out = again.transform(&x.row(0)).unwrap();
            assert_eq!(out.fields(), first.selected());
        }
    }

    #[test]
    fn ties_break_by_field_order() {
        // Two identical columns score identically; the earlier one wins.
        let x = matrix(
            &["a", "b", "c"],
            &[&[1.0, 1.0, 0.0], &[2.0, 2.0, 0.0], &[3.0, 3.0, 0.0], &[4.0, 4.0, 0.0]],
        );
        let y = vec![1.0, 3.0, 2.0, 5.0];
        let sel = FittedFeatureSelector::fit(&x, &y, 1).unwrap();
        assert_eq!(sel.selected(), &["a".to_string()]);
    }

    #[test]
    fn rejects_invalid_k() {
        let (x, y) = training_set();
        assert_eq!(
            FittedFeatureSelector::fit(&x, &y, 5).unwrap_err(),
            PipelineError::InvalidK { k: 5, available: 4 }
        );
        assert!(matches!(
            FittedFeatureSelector::fit(&x, &y, 0),
            Err(PipelineError::InvalidK { .. })
        ));
    }

    #[test]
    fn transform_requires_retained_fields() {
        let (x, y) = training_set();
        let sel = FittedFeatureSelector::fit(&x, &y, 2).unwrap();

        let partial = FeatureVector::new(
            Stage::Preprocessed,
            vec!["flat".into(), "strong".into()],
            vec![0.0, 1.0],
        )
        .unwrap();
        let err = sel.transform(&partial).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref detail, .. } if detail.contains("weak")));
    }

    #[test]
    fn transform_rejects_raw_input() {
        let (x, y) = training_set();
        let sel = FittedFeatureSelector::fit(&x, &y, 2).unwrap();
        let raw = FeatureVector::raw([("flat", 1.0), ("weak", 1.0), ("strong", 1.0), ("noise", 0.0)]).unwrap();
        assert!(matches!(
            sel.transform(&raw),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn f_statistic_matches_closed_form() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 2.0, 5.0];
        // Σdxdy = 5.5, Σdx² = 5, Σdy² = 8.75
        let r: f64 = 5.5 / (5.0_f64 * 8.75).sqrt();
        let expected = r * r / (1.0 - r * r) * 2.0;
        assert!((f_statistic(&x, &y) - expected).abs() < 1e-12);
    }
}
