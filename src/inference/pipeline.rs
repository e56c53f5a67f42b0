//! The serving-time composition of fitted stages.
//!
//! ```text
//! StructuredRecord -> Raw -> preprocess -> Preprocessed -> select -> Selected -> predict -> f64
//! ```
//!
//! Stages are injected at construction and checked against each other once,
//! so a pipeline that exists is a pipeline whose schemas line up. After that
//! every call is a pure function of the record: no locks, no re-fitting.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::{StructuredRecord, canonical_field_names, ensure_fields};
use crate::error::PipelineError;
use crate::inference::request::PredictionRequest;
use crate::io::artifact;
use crate::models::Predictor;
use crate::preprocess::FittedPreprocessor;
use crate::select::FittedFeatureSelector;
use crate::transform::{FittedTransform, Regressor};

/// Run the four inference steps in their fixed order.
pub fn infer<P, S, M>(
    raw: &StructuredRecord,
    preprocessor: &P,
    selector: &S,
    predictor: &M,
) -> Result<f64, PipelineError>
where
    P: FittedTransform + ?Sized,
    S: FittedTransform + ?Sized,
    M: Regressor + ?Sized,
{
    let features = raw.feature_vector();
    let preprocessed = preprocessor.transform(&features)?;
    let selected = selector.transform(&preprocessed)?;
    let result = predictor.predict(&selected)?;
    debug!(fips = raw.fips.as_deref().unwrap_or("-"), result, "inferred");
    Ok(result)
}

/// Loaded, schema-checked preprocessor + selector + predictor.
#[derive(Debug, Clone)]
pub struct InferencePipeline<P = FittedPreprocessor, S = FittedFeatureSelector, M = Predictor> {
    preprocessor: P,
    selector: S,
    predictor: M,
}

impl<P, S, M> InferencePipeline<P, S, M>
where
    P: FittedTransform,
    S: FittedTransform,
    M: Regressor,
{
    /// Assemble a pipeline, rejecting stages fit on different schemas.
    pub fn new(preprocessor: P, selector: S, predictor: M) -> Result<Self, PipelineError> {
        ensure_fields("preprocessor", &canonical_field_names(), preprocessor.input_fields())?;
        ensure_fields("feature selector", preprocessor.output_fields(), selector.input_fields())?;
        ensure_fields("predictor", selector.output_fields(), predictor.fields())?;
        Ok(Self {
            preprocessor,
            selector,
            predictor,
        })
    }

    /// Like [`InferencePipeline::new`], but for stages that may be absent.
    pub fn from_parts(preprocessor: Option<P>, selector: Option<S>, predictor: Option<M>) -> Result<Self, PipelineError> {
        let preprocessor =
            preprocessor.ok_or_else(|| PipelineError::PipelineNotReady("preprocessor is missing".to_string()))?;
        let selector =
            selector.ok_or_else(|| PipelineError::PipelineNotReady("feature selector is missing".to_string()))?;
        let predictor =
            predictor.ok_or_else(|| PipelineError::PipelineNotReady("predictor is missing".to_string()))?;
        Self::new(preprocessor, selector, predictor)
    }

    pub fn infer(&self, raw: &StructuredRecord) -> Result<f64, PipelineError> {
        infer(raw, &self.preprocessor, &self.selector, &self.predictor)
    }

    /// Validate a boundary request and score it.
    pub fn infer_request(&self, request: &PredictionRequest) -> Result<f64, PipelineError> {
        let record = request.to_record()?;
        self.infer(&record)
    }

    /// Score many records in parallel. Results keep input order.
    pub fn infer_batch(&self, records: &[StructuredRecord]) -> Result<Vec<f64>, PipelineError> {
        records.par_iter().map(|r| self.infer(r)).collect()
    }

    pub fn preprocessor(&self) -> &P {
        &self.preprocessor
    }

    pub fn selector(&self) -> &S {
        &self.selector
    }

    pub fn predictor(&self) -> &M {
        &self.predictor
    }
}

impl InferencePipeline {
    /// Load the three artifacts from `dir` and check them against each other.
    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        let preprocessor: FittedPreprocessor = artifact::load(dir)?;
        let selector: FittedFeatureSelector = artifact::load(dir)?;
        let predictor: Predictor = artifact::load(dir)?;
        let pipeline = Self::new(preprocessor, selector, predictor)?;
        info!(
            dir = %dir.display(),
            selected = ?pipeline.selector.selected(),
            "inference pipeline loaded"
        );
        Ok(pipeline)
    }

    /// Write all three artifacts into `dir`, returning their paths.
    pub fn save(&self, dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        Ok(vec![
            artifact::save(dir, &self.preprocessor)?,
            artifact::save(dir, &self.selector)?,
            artifact::save(dir, &self.predictor)?,
        ])
    }
}
