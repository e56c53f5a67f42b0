//! Shared "train" and "predict" workflows.
//!
//! Keeping these in one place avoids duplicating the core sequence:
//! structured CSV -> fit pipeline -> artifacts + report (+ matrix exports)
//!
//! The CLI then only focuses on presentation.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{AppError, PipelineError};
use crate::fit::{FitOptions, TrainingReport, fit_pipeline, log_stage_failure, run_stage};
use crate::inference::{InferencePipeline, PredictionRequest};
use crate::io::ingest::{IngestedData, load_structured};

pub const REPORT_FILE_NAME: &str = "training_report.json";

#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub input: PathBuf,
    pub artifact_dir: PathBuf,
    pub report_path: PathBuf,
    pub export_dir: Option<PathBuf>,
    pub options: FitOptions,
}

/// All outputs of a single `obp train` run.
#[derive(Debug, Clone)]
pub struct TrainOutput {
    pub ingest: IngestedData,
    pub report: TrainingReport,
    pub artifacts: Vec<PathBuf>,
    pub pipeline: InferencePipeline,
}

/// Ingest, fit, persist.
pub fn run_train(config: &TrainConfig) -> Result<TrainOutput, AppError> {
    let ingest = load_structured(&config.input).inspect_err(|e| log_stage_failure("ingest", 0, e))?;
    info!(
        path = %config.input.display(),
        rows_read = ingest.rows_read,
        rows_used = ingest.rows_used,
        rejected = ingest.row_errors.len(),
        "structured data loaded"
    );
    if ingest.records.is_empty() {
        let err = PipelineError::InsufficientData(format!(
            "no usable rows in '{}' ({} read)",
            config.input.display(),
            ingest.rows_read
        ));
        log_stage_failure("ingest", ingest.rows_read, &err);
        return Err(err.into());
    }

    let trained = fit_pipeline(&ingest.records, &config.options)?;

    let artifacts = run_stage("persist", trained.report.records_train, || {
        trained.pipeline.save(&config.artifact_dir)
    })?;

    crate::io::report::write_report_json(&config.report_path, &trained.report)?;
    info!(path = %config.report_path.display(), "training report written");

    if let Some(dir) = &config.export_dir {
        let m = &trained.matrices;
        crate::io::export::write_matrix_csv(&dir.join("preprocessed_train.csv"), &m.preprocessed, Some(&m.targets))?;
        crate::io::export::write_matrix_csv(&dir.join("selected_train.csv"), &m.selected, Some(&m.targets))?;
        info!(dir = %dir.display(), "training matrices exported");
    }

    Ok(TrainOutput {
        ingest,
        report: trained.report,
        artifacts,
        pipeline: trained.pipeline,
    })
}

/// Load artifacts from `artifact_dir` and score one request.
pub fn run_predict(artifact_dir: &Path, request: &PredictionRequest) -> Result<f64, AppError> {
    let pipeline = InferencePipeline::load(artifact_dir)?;
    let value = pipeline.infer_request(request)?;
    Ok(value)
}
