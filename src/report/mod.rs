//! Reporting utilities: terminal summaries for ingest, training and prediction.

pub mod format;

pub use format::*;
