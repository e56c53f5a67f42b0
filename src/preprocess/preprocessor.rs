//! Fitted preprocessor.
//!
//! Fit learns, per field:
//!
//! - the imputation statistic: mean of observed (non-missing) values
//! - the scaling statistics: mean and population standard deviation of the
//!   column *after* imputation
//!
//! Transform replaces missing values with the imputation mean, then applies
//! `z = (x - mean) / std`.
//!
//! Zero-variance policy: a field whose training std is at or below
//! [`ZERO_VARIANCE_EPS`] maps every input to [`ZERO_VARIANCE_OUTPUT`]. The
//! field carries no information the model could have learned from, so it is
//! pinned to the training mean's z-score instead of dividing by zero.

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureMatrix, FeatureVector, Stage, ensure_fields, ensure_stage};
use crate::error::PipelineError;
use crate::transform::FittedTransform;

/// Standard deviations at or below this are treated as zero variance.
pub const ZERO_VARIANCE_EPS: f64 = 1e-12;

/// Output value for a zero-variance field.
pub const ZERO_VARIANCE_OUTPUT: f64 = 0.0;

const STAGE: &str = "preprocessor";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    fields: Vec<String>,
    impute_mean: Vec<f64>,
    scale_mean: Vec<f64>,
    scale_std: Vec<f64>,
    n_samples: usize,
}

impl FittedPreprocessor {
    /// Fit on raw-stage training vectors that share one schema.
    pub fn fit(training: &[FeatureVector]) -> Result<Self, PipelineError> {
        if training.is_empty() {
            return Err(PipelineError::InsufficientData(
                "cannot fit preprocessor on zero records".to_string(),
            ));
        }
        let matrix = FeatureMatrix::from_vectors(training)?;
        ensure_stage(STAGE, Stage::Raw, matrix.stage())?;

        let n = matrix.nrows();
        let mut impute_mean = Vec::with_capacity(matrix.ncols());
        let mut scale_mean = Vec::with_capacity(matrix.ncols());
        let mut scale_std = Vec::with_capacity(matrix.ncols());

        for (j, field) in matrix.fields().iter().enumerate() {
            let column = matrix.data().column(j);
            if let Some(bad) = column.iter().find(|v| v.is_infinite()) {
                return Err(PipelineError::InvalidInput {
                    field: field.clone(),
                    reason: format!("non-finite training value {bad}"),
                });
            }

            let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.is_empty() {
                return Err(PipelineError::InsufficientData(format!(
                    "field `{field}` has no observed values in {n} training record(s)"
                )));
            }
            let fill = mean(&observed);

            let imputed: Vec<f64> = column
                .iter()
                .map(|&v| if v.is_nan() { fill } else { v })
                .collect();
            let mu = mean(&imputed);
            let var = imputed.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / n as f64;

            impute_mean.push(fill);
            scale_mean.push(mu);
            scale_std.push(var.sqrt());
        }

        Ok(Self {
            fields: matrix.fields().to_vec(),
            impute_mean,
            scale_mean,
            scale_std,
            n_samples: n,
        })
    }

    /// Transform every row of a raw-stage matrix.
    pub fn transform_matrix(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix, PipelineError> {
        let rows = matrix
            .rows()
            .map(|row| self.transform(&row))
            .collect::<Result<Vec<_>, _>>()?;
        FeatureMatrix::from_vectors(&rows)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn impute_means(&self) -> &[f64] {
        &self.impute_mean
    }

    pub fn scale_means(&self) -> &[f64] {
        &self.scale_mean
    }

    pub fn scale_stds(&self) -> &[f64] {
        &self.scale_std
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Structural check for artifacts read back from disk.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let n = self.fields.len();
        if self.impute_mean.len() != n || self.scale_mean.len() != n || self.scale_std.len() != n {
            return Err(PipelineError::Artifact(format!(
                "preprocessor has {n} field(s) but statistics of length {}/{}/{}",
                self.impute_mean.len(),
                self.scale_mean.len(),
                self.scale_std.len()
            )));
        }
        let finite = self
            .impute_mean
            .iter()
            .chain(&self.scale_mean)
            .chain(&self.scale_std)
            .all(|v| v.is_finite());
        if !finite || self.scale_std.iter().any(|&s| s < 0.0) {
            return Err(PipelineError::Artifact(
                "preprocessor statistics must be finite with non-negative std".to_string(),
            ));
        }
        Ok(())
    }
}

impl FittedTransform for FittedPreprocessor {
    fn input_fields(&self) -> &[String] {
        &self.fields
    }

    fn output_fields(&self) -> &[String] {
        &self.fields
    }

    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PipelineError> {
        ensure_stage(STAGE, Stage::Raw, features.stage())?;
        ensure_fields(STAGE, &self.fields, features.fields())?;

        let mut out = Vec::with_capacity(self.fields.len());
        for (j, &v) in features.values().iter().enumerate() {
            if v.is_infinite() {
                return Err(PipelineError::InvalidInput {
                    field: self.fields[j].clone(),
                    reason: format!("non-finite value {v}"),
                });
            }
            let x = if v.is_nan() { self.impute_mean[j] } else { v };
            out.push(standardize(x, self.scale_mean[j], self.scale_std[j]));
        }
        Ok(FeatureVector::from_parts(Stage::Preprocessed, self.fields.clone(), out))
    }
}

fn standardize(x: f64, mean: f64, std: f64) -> f64 {
    if std <= ZERO_VARIANCE_EPS {
        return ZERO_VARIANCE_OUTPUT;
    }
    (x - mean) / std
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MISSING;

    fn raw(pairs: &[(&str, f64)]) -> FeatureVector {
        FeatureVector::raw(pairs.iter().map(|&(k, v)| (k, v))).unwrap()
    }

    #[test]
    fn imputes_with_mean_of_observed_values() {
        let training = vec![raw(&[("a", 1.0), ("b", MISSING)]), raw(&[("a", 3.0), ("b", 5.0)])];
        let pre = FittedPreprocessor::fit(&training).unwrap();
        assert_eq!(pre.impute_means(), &[2.0, 5.0]);

        // `b` has one observed value, so after imputation it is constant.
        let out = pre.transform(&raw(&[("a", MISSING), ("b", MISSING)])).unwrap();
        assert_eq!(out.values(), &[0.0, ZERO_VARIANCE_OUTPUT]);
    }

    #[test]
    fn standardizes_with_population_std() {
        let training: Vec<_> = [2.0, 4.0, 6.0].iter().map(|&v| raw(&[("x", v)])).collect();
        let pre = FittedPreprocessor::fit(&training).unwrap();

        let std = (8.0_f64 / 3.0).sqrt();
        assert!((pre.scale_stds()[0] - std).abs() < 1e-12);
        assert!((std - 1.633).abs() < 1e-3);

        let at_mean = pre.transform(&raw(&[("x", 4.0)])).unwrap();
        assert_eq!(at_mean.values(), &[0.0]);

        let one_sd = pre.transform(&raw(&[("x", 4.0 + std)])).unwrap();
        assert!((one_sd.values()[0] - 1.0).abs() < 1e-12);
        assert_eq!(one_sd.stage(), Stage::Preprocessed);
    }

    #[test]
    fn zero_variance_field_maps_to_policy_value() {
        let training: Vec<_> = (0..4).map(|_| raw(&[("c", 0.1)])).collect();
        let pre = FittedPreprocessor::fit(&training).unwrap();

        for input in [0.1, 0.5, -3.0, MISSING] {
            let out = pre.transform(&raw(&[("c", input)])).unwrap();
            assert_eq!(out.values()[0], ZERO_VARIANCE_OUTPUT);
            assert!(out.values()[0].is_finite());
        }
    }

    #[test]
    fn fit_fails_without_observations() {
        assert!(matches!(
            FittedPreprocessor::fit(&[]),
            Err(PipelineError::InsufficientData(_))
        ));

        let training = vec![raw(&[("a", 1.0), ("b", MISSING)]), raw(&[("a", 2.0), ("b", MISSING)])];
        let err = FittedPreprocessor::fit(&training).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(ref m) if m.contains("`b`")));
    }

    #[test]
    fn transform_requires_exact_schema() {
        let training = vec![raw(&[("a", 1.0), ("b", 2.0)]), raw(&[("a", 3.0), ("b", 4.0)])];
        let pre = FittedPreprocessor::fit(&training).unwrap();

        let missing = pre.transform(&raw(&[("a", 1.0)])).unwrap_err();
        assert!(matches!(missing, PipelineError::SchemaMismatch { .. }));

        let extra = pre.transform(&raw(&[("a", 1.0), ("b", 2.0), ("c", 3.0)])).unwrap_err();
        assert!(matches!(extra, PipelineError::SchemaMismatch { .. }));

        let reordered = pre.transform(&raw(&[("b", 2.0), ("a", 1.0)])).unwrap_err();
        assert!(matches!(reordered, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn transform_rejects_already_preprocessed_input() {
        let training = vec![raw(&[("a", 1.0)]), raw(&[("a", 3.0)])];
        let pre = FittedPreprocessor::fit(&training).unwrap();
        let once = pre.transform(&raw(&[("a", 2.0)])).unwrap();
        assert!(matches!(
            pre.transform(&once),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn transform_is_bit_identical_across_calls() {
        let training = vec![
            raw(&[("a", 0.13), ("b", 7.0)]),
            raw(&[("a", 0.29), ("b", MISSING)]),
            raw(&[("a", 0.31), ("b", 11.0)]),
        ];
        let pre = FittedPreprocessor::fit(&training).unwrap();
        let v = raw(&[("a", 0.2), ("b", MISSING)]);

        let first = pre.transform(&v).unwrap();
        for _ in 0..10 {
            let again = pre.transform(&v).unwrap();
            let a: Vec<u64> = first.values().iter().map(|x| x.to_bits()).collect();
            let b: Vec<u64> = again.values().iter().map(|x| x.to_bits()).collect();
            assert_eq!(a, b);
        }
    }
}
