//! Offline training: records in, fitted pipeline + report out.
//!
//! Stages run in a fixed order and each is named for logging:
//!
//! ```text
//! ingest -> split -> preprocess -> select -> fit -> evaluate
//! ```
//!
//! (`persist` is the caller's last stage; see `app::pipeline`.)
//!
//! Every fitted component sees the training partition only. The held-out
//! partition is scored through [`InferencePipeline`], the same code path a
//! prediction request takes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::domain::{FeatureMatrix, FeatureVector, StructuredRecord};
use crate::error::PipelineError;
use crate::fit::metrics::{RegressionMetrics, regression_metrics};
use crate::fit::split::{DEFAULT_SPLIT_SEED, DEFAULT_TEST_FRACTION, train_test_split};
use crate::inference::InferencePipeline;
use crate::models::Predictor;
use crate::preprocess::FittedPreprocessor;
use crate::select::FittedFeatureSelector;

/// Number of features kept when the caller does not choose.
pub const DEFAULT_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub k: usize,
    pub test_fraction: f64,
    pub split_seed: u64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            test_fraction: DEFAULT_TEST_FRACTION,
            split_seed: DEFAULT_SPLIT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFeature {
    pub name: String,
    pub score: f64,
}

/// Human-auditable summary of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub created_at: DateTime<Utc>,
    pub records_total: usize,
    pub records_labeled: usize,
    pub records_train: usize,
    pub records_test: usize,
    pub split_seed: u64,
    pub test_fraction: f64,
    pub k: usize,
    pub selected: Vec<SelectedFeature>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub train_metrics: Option<RegressionMetrics>,
    pub test_metrics: Option<RegressionMetrics>,
}

/// Intermediate training matrices, kept for optional export.
#[derive(Debug, Clone)]
pub struct StageMatrices {
    pub preprocessed: FeatureMatrix,
    pub selected: FeatureMatrix,
    pub targets: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct TrainedPipeline {
    pub pipeline: InferencePipeline,
    pub report: TrainingReport,
    pub matrices: StageMatrices,
}

/// Run one named stage, logging the failure with the record count it was working on.
pub fn run_stage<T>(
    stage: &'static str,
    records: usize,
    f: impl FnOnce() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    f().inspect_err(|err| log_stage_failure(stage, records, err))
}

/// Log a failed stage by name with the record count it had reached.
pub fn log_stage_failure(stage: &str, records: usize, err: &dyn std::fmt::Display) {
    error!(stage, records_processed = records, error = %err, "pipeline stage failed");
}

/// Fit preprocessor, selector and predictor on `records` and evaluate on a held-out split.
///
/// Records without a target are dropped before splitting.
pub fn fit_pipeline(records: &[StructuredRecord], opts: &FitOptions) -> Result<TrainedPipeline, PipelineError> {
    let labeled: Vec<(&StructuredRecord, f64)> = run_stage("ingest", records.len(), || {
        let labeled: Vec<_> = records
            .iter()
            .filter_map(|r| r.obesity_percentage_2017.map(|y| (r, y)))
            .collect();
        if labeled.is_empty() {
            return Err(PipelineError::InsufficientData(format!(
                "none of {} record(s) has a target value",
                records.len()
            )));
        }
        Ok(labeled)
    })?;
    info!(records = records.len(), labeled = labeled.len(), "ingest complete");

    let split = run_stage("split", labeled.len(), || {
        train_test_split(labeled.len(), opts.test_fraction, opts.split_seed)
    })?;
    let train_records: Vec<&StructuredRecord> = split.train.iter().map(|&i| labeled[i].0).collect();
    let test_records: Vec<StructuredRecord> = split.test.iter().map(|&i| labeled[i].0.clone()).collect();
    let y_train: Vec<f64> = split.train.iter().map(|&i| labeled[i].1).collect();
    let y_test: Vec<f64> = split.test.iter().map(|&i| labeled[i].1).collect();
    info!(train = split.train.len(), test = split.test.len(), seed = opts.split_seed, "split complete");

    let raw_train: Vec<FeatureVector> = train_records.iter().map(|r| r.feature_vector()).collect();

    let (preprocessor, preprocessed) = run_stage("preprocess", raw_train.len(), || {
        let preprocessor = FittedPreprocessor::fit(&raw_train)?;
        let raw = FeatureMatrix::from_vectors(&raw_train)?;
        let preprocessed = preprocessor.transform_matrix(&raw)?;
        Ok((preprocessor, preprocessed))
    })?;

    let (selector, selected) = run_stage("select", preprocessed.nrows(), || {
        let selector = FittedFeatureSelector::fit(&preprocessed, &y_train, opts.k)?;
        let selected = selector.transform_matrix(&preprocessed)?;
        Ok((selector, selected))
    })?;
    info!(k = selector.k(), selected = ?selector.selected(), "features selected");

    let predictor = run_stage("fit", selected.nrows(), || Predictor::fit(&selected, &y_train))?;
    info!(
        intercept = predictor.intercept(),
        coefficients = ?predictor.coefficients(),
        "predictor fit"
    );

    let (pipeline, train_metrics, test_metrics) = run_stage("evaluate", test_records.len(), || {
        let train_pred = predictor.predict_matrix(&selected)?;
        let pipeline = InferencePipeline::new(preprocessor, selector, predictor)?;
        let test_pred = pipeline.infer_batch(&test_records)?;
        Ok((
            pipeline,
            regression_metrics(&train_pred, &y_train),
            regression_metrics(&test_pred, &y_test),
        ))
    })?;
    if let Some(m) = &test_metrics {
        info!(n = m.n, rmse = m.rmse, mae = m.mae, r2 = ?m.r2, "held-out evaluation");
    }

    let report = TrainingReport {
        created_at: Utc::now(),
        records_total: records.len(),
        records_labeled: labeled.len(),
        records_train: split.train.len(),
        records_test: split.test.len(),
        split_seed: opts.split_seed,
        test_fraction: opts.test_fraction,
        k: pipeline.selector().k(),
        selected: pipeline
            .selector()
            .selected()
            .iter()
            .zip(pipeline.selector().selected_scores())
            .map(|(name, &score)| SelectedFeature {
                name: name.clone(),
                score,
            })
            .collect(),
        intercept: pipeline.predictor().intercept(),
        coefficients: pipeline.predictor().coefficients().to_vec(),
        train_metrics,
        test_metrics,
    };

    Ok(TrainedPipeline {
        pipeline,
        report,
        matrices: StageMatrices {
            preprocessed,
            selected,
            targets: y_train,
        },
    })
}
