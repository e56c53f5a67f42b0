//! Ordered feature containers.
//!
//! A [`FeatureVector`] carries its field names and the pipeline stage that
//! produced it. The stage tag is what lets each fitted artifact refuse input
//! that skipped or reordered a step: a raw vector and a preprocessed vector can
//! have identical field names but are not interchangeable.

use std::collections::HashSet;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Marker for an unobserved value.
pub const MISSING: f64 = f64::NAN;

/// Which representation a vector is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Model units, may contain missing values.
    Raw,
    /// Imputed and standardized.
    Preprocessed,
    /// Projected onto the selected subset.
    Selected,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Raw => "raw",
            Stage::Preprocessed => "preprocessed",
            Stage::Selected => "selected",
        };
        f.write_str(s)
    }
}

/// Ordered mapping of field name to value.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    stage: Stage,
    fields: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build a vector, checking that names are unique and match the values.
    pub fn new(stage: Stage, fields: Vec<String>, values: Vec<f64>) -> Result<Self, PipelineError> {
        if fields.len() != values.len() {
            return Err(PipelineError::schema(
                "feature vector",
                format!("{} field name(s) for {} value(s)", fields.len(), values.len()),
            ));
        }
        ensure_unique(&fields)?;
        Ok(Self { stage, fields, values })
    }

    /// Build a raw-stage vector from `(name, value)` pairs.
    pub fn raw<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Result<Self, PipelineError> {
        let (fields, values): (Vec<String>, Vec<f64>) =
            pairs.into_iter().map(|(name, v)| (name.into(), v)).unzip();
        Self::new(Stage::Raw, fields, values)
    }

    /// Unchecked constructor for callers that already own a validated schema.
    pub(crate) fn from_parts(stage: Stage, fields: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(fields.len(), values.len());
        Self { stage, fields, values }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.position(field).map(|i| self.values[i])
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }
}

/// Row-major collection of vectors that share one schema and stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    stage: Stage,
    fields: Vec<String>,
    data: DMatrix<f64>,
}

impl FeatureMatrix {
    /// Stack vectors into a matrix.
    ///
    /// Fails with `InsufficientData` for an empty slice and `SchemaMismatch`
    /// if any vector differs from the first in stage or field order.
    pub fn from_vectors(rows: &[FeatureVector]) -> Result<Self, PipelineError> {
        let Some(first) = rows.first() else {
            return Err(PipelineError::InsufficientData(
                "cannot build a feature matrix from zero rows".to_string(),
            ));
        };

        for (i, row) in rows.iter().enumerate().skip(1) {
            if row.stage != first.stage {
                return Err(PipelineError::schema(
                    "feature matrix",
                    format!("row {i} is {} but row 0 is {}", row.stage, first.stage),
                ));
            }
            ensure_fields("feature matrix", &first.fields, &row.fields)?;
        }

        let ncols = first.len();
        let data = DMatrix::from_row_iterator(
            rows.len(),
            ncols,
            rows.iter().flat_map(|r| r.values.iter().copied()),
        );
        Ok(Self {
            stage: first.stage,
            fields: first.fields.clone(),
            data,
        })
    }

    pub(crate) fn from_parts(stage: Stage, fields: Vec<String>, data: DMatrix<f64>) -> Self {
        debug_assert_eq!(fields.len(), data.ncols());
        Self { stage, fields, data }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Copy row `i` out as a vector.
    pub fn row(&self, i: usize) -> FeatureVector {
        let values = self.data.row(i).iter().copied().collect();
        FeatureVector::from_parts(self.stage, self.fields.clone(), values)
    }

    pub fn rows(&self) -> impl Iterator<Item = FeatureVector> + '_ {
        (0..self.nrows()).map(|i| self.row(i))
    }
}

pub(crate) fn ensure_stage(stage_name: &'static str, expected: Stage, got: Stage) -> Result<(), PipelineError> {
    if expected != got {
        return Err(PipelineError::schema(
            stage_name,
            format!("expected {expected} features, got {got} features"),
        ));
    }
    Ok(())
}

/// Require `got` to equal `expected` exactly (same names, same order).
pub(crate) fn ensure_fields(
    stage_name: &'static str,
    expected: &[String],
    got: &[String],
) -> Result<(), PipelineError> {
    if expected == got {
        return Ok(());
    }

    let got_set: HashSet<&str> = got.iter().map(String::as_str).collect();
    let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();

    let missing: Vec<&str> = expected
        .iter()
        .map(String::as_str)
        .filter(|f| !got_set.contains(f))
        .collect();
    let extra: Vec<&str> = got
        .iter()
        .map(String::as_str)
        .filter(|f| !expected_set.contains(f))
        .collect();

    let detail = if missing.is_empty() && extra.is_empty() {
        format!("field order differs: expected [{}], got [{}]", expected.join(", "), got.join(", "))
    } else {
        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("missing [{}]", missing.join(", ")));
        }
        if !extra.is_empty() {
            parts.push(format!("unexpected [{}]", extra.join(", ")));
        }
        parts.join("; ")
    };
    Err(PipelineError::schema(stage_name, detail))
}

fn ensure_unique(fields: &[String]) -> Result<(), PipelineError> {
    let mut seen = HashSet::with_capacity(fields.len());
    for f in fields {
        if !seen.insert(f.as_str()) {
            return Err(PipelineError::schema(
                "feature vector",
                format!("duplicate field `{f}`"),
            ));
        }
    }
    Ok(())
}
