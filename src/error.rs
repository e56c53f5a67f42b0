//! Error types.
//!
//! - [`PipelineError`] is the library-level taxonomy raised by the fitted
//!   transforms, the predictor and the inference pipeline. Every variant is a
//!   local condition the caller can act on; nothing here is retried.
//! - [`AppError`] is what the `obp` binary reports: a message plus a process
//!   exit code.

/// Failures raised by the transform/inference core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Field set, field order, field count or representation stage differs
    /// between what a stage expects and what it was given.
    #[error("schema mismatch in {stage}: {detail}")]
    SchemaMismatch { stage: &'static str, detail: String },

    /// A fit was attempted without usable observations.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Feature selection asked for more fields than exist (or for none).
    #[error("invalid k={k}: {available} feature(s) available")]
    InvalidK { k: usize, available: usize },

    /// An artifact required at inference time is missing.
    #[error("pipeline not ready: {0}")]
    PipelineNotReady(String),

    /// Predictor fit/predict on singular or empty input.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A value is non-finite or outside the plausible range for its field.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidInput { field: String, reason: String },

    /// An artifact blob could not be encoded/decoded or has the wrong kind/version.
    #[error("artifact error: {0}")]
    Artifact(String),
}

impl PipelineError {
    pub(crate) fn schema(stage: &'static str, detail: impl Into<String>) -> Self {
        PipelineError::SchemaMismatch {
            stage,
            detail: detail.into(),
        }
    }

    /// Exit code used when this error terminates the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::SchemaMismatch { .. }
            | PipelineError::InvalidK { .. }
            | PipelineError::InvalidInput { .. }
            | PipelineError::PipelineNotReady(_) => 2,
            PipelineError::InsufficientData(_) => 3,
            PipelineError::DegenerateInput(_) | PipelineError::Artifact(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
