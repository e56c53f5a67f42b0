//! Linear regression predictor.
//!
//! The estimator is ordinary least squares with an intercept, fit on the
//! selected-feature matrix. Fitting goes through [`crate::math`]; prediction is
//! a dot product against the stored coefficients.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{FeatureMatrix, FeatureVector, Stage, TARGET_FIELD, ensure_fields, ensure_stage};
use crate::error::PipelineError;
use crate::math::{numerical_rank, solve_least_squares};
use crate::transform::Regressor;

const STAGE: &str = "predictor";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictor {
    fields: Vec<String>,
    intercept: f64,
    coefficients: Vec<f64>,
    n_samples: usize,
}

impl Predictor {
    /// Fit on a selected-stage matrix.
    ///
    /// Fails with `DegenerateInput` when there are fewer rows than parameters
    /// or the design matrix is rank deficient (constant or collinear columns).
    pub fn fit(x: &FeatureMatrix, y: &[f64]) -> Result<Self, PipelineError> {
        ensure_stage(STAGE, Stage::Selected, x.stage())?;

        let n = x.nrows();
        let p = x.ncols() + 1;
        if n == 0 {
            return Err(PipelineError::DegenerateInput(
                "cannot fit predictor on zero rows".to_string(),
            ));
        }
        if y.len() != n {
            return Err(PipelineError::schema(
                STAGE,
                format!("{} target value(s) for {n} feature row(s)", y.len()),
            ));
        }
        if n < p {
            return Err(PipelineError::DegenerateInput(format!(
                "{n} row(s) cannot determine {p} parameter(s)"
            )));
        }
        if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidInput {
                field: TARGET_FIELD.to_string(),
                reason: format!("non-finite target value {bad}"),
            });
        }
        if x.data().iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::DegenerateInput(
                "feature matrix contains non-finite values".to_string(),
            ));
        }

        let design = DMatrix::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { x.data()[(i, j - 1)] });
        let rank = numerical_rank(&design);
        if rank < p {
            return Err(PipelineError::DegenerateInput(format!(
                "design matrix has rank {rank} < {p}: constant or collinear columns"
            )));
        }

        let target = DVector::from_column_slice(y);
        let beta = solve_least_squares(&design, &target).ok_or_else(|| {
            PipelineError::DegenerateInput("least squares solve did not converge".to_string())
        })?;

        Ok(Self {
            fields: x.fields().to_vec(),
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
            n_samples: n,
        })
    }

    /// Score every row of a selected-stage matrix.
    pub fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Vec<f64>, PipelineError> {
        ensure_stage(STAGE, Stage::Selected, x.stage())?;
        ensure_fields(STAGE, &self.fields, x.fields())?;
        (0..x.nrows())
            .into_par_iter()
            .map(|i| self.predict(&x.row(i)))
            .collect()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Structural check for artifacts read back from disk.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.coefficients.len() != self.fields.len() {
            return Err(PipelineError::Artifact(format!(
                "predictor has {} field(s) but {} coefficient(s)",
                self.fields.len(),
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PipelineError::Artifact("predictor parameters must be finite".to_string()));
        }
        Ok(())
    }
}

impl Regressor for Predictor {
    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, PipelineError> {
        ensure_stage(STAGE, Stage::Selected, features.stage())?;
        ensure_fields(STAGE, &self.fields, features.fields())?;

        let mut y = self.intercept;
        for (j, (&c, &v)) in self.coefficients.iter().zip(features.values()).enumerate() {
            if !v.is_finite() {
                return Err(PipelineError::InvalidInput {
                    field: self.fields[j].clone(),
                    reason: format!("non-finite value {v}"),
                });
            }
            y += c * v;
        }
        Ok(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(fields: &[&str], rows: &[&[f64]]) -> FeatureMatrix {
        let vectors: Vec<FeatureVector> = rows
            .iter()
            .map(|r| {
                FeatureVector::new(
                    Stage::Selected,
                    fields.iter().map(|s| s.to_string()).collect(),
                    r.to_vec(),
                )
                .unwrap()
            })
            .collect();
        FeatureMatrix::from_vectors(&vectors).unwrap()
    }

    #[test]
    fn recovers_exact_linear_relationship() {
        // y = 1 + 2a - 0.5b
        let x = selected(
            &["a", "b"],
            &[&[0.0, 0.0], &[1.0, 0.0], &[0.0, 2.0], &[2.0, 1.0], &[-1.0, 3.0]],
        );
        let y: Vec<f64> = x.rows().map(|r| 1.0 + 2.0 * r.values()[0] - 0.5 * r.values()[1]).collect();

        let model = Predictor::fit(&x, &y).unwrap();
        assert!((model.intercept() - 1.0).abs() < 1e-9);
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients()[1] + 0.5).abs() < 1e-9);

        let preds = model.predict_matrix(&x).unwrap();
        for (p, t) in preds.iter().zip(&y) {
            assert!((p - t).abs() < 1e-9);
        }
    }

    #[test]
    fn constant_column_is_degenerate() {
        let x = selected(&["a", "flat"], &[&[0.0, 0.0], &[1.0, 0.0], &[2.0, 0.0], &[3.0, 0.0]]);
        let err = Predictor::fit(&x, &[1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateInput(_)));
    }

    #[test]
    fn too_few_rows_is_degenerate() {
        let x = selected(&["a", "b"], &[&[0.0, 1.0], &[1.0, 0.0]]);
        assert!(matches!(
            Predictor::fit(&x, &[1.0, 2.0]),
            Err(PipelineError::DegenerateInput(_))
        ));
    }

    #[test]
    fn predict_rejects_other_schemas() {
        let x = selected(&["a", "b"], &[&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0], &[1.0, 1.0]]);
        let model = Predictor::fit(&x, &[0.0, 1.0, 2.0, 3.5]).unwrap();

        let reordered = FeatureVector::new(Stage::Selected, vec!["b".into(), "a".into()], vec![0.0, 0.0]).unwrap();
        assert!(matches!(
            model.predict(&reordered),
            Err(PipelineError::SchemaMismatch { .. })
        ));

        let unselected = FeatureVector::new(Stage::Preprocessed, vec!["a".into(), "b".into()], vec![0.0, 0.0]).unwrap();
        assert!(matches!(
            model.predict(&unselected),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn predict_is_bit_identical_across_calls() {
        let x = selected(&["a"], &[&[0.1], &[0.7], &[1.3], &[2.9]]);
        let model = Predictor::fit(&x, &[0.3, 0.2, 0.9, 1.7]).unwrap();
        let v = x.row(2);
        let first = model.predict(&v).unwrap().to_bits();
        for _ in 0..10 {
            assert_eq!(model.predict(&v).unwrap().to_bits(), first);
        }
    }
}
