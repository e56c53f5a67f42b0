//! Offline training orchestration.
//!
//! Responsibilities:
//!
//! - fixed-seed train/test split
//! - fit preprocessor -> selector -> predictor on the training partition
//! - score the held-out partition through the inference pipeline

pub mod metrics;
pub mod split;
pub mod trainer;

pub use metrics::*;
pub use split::*;
pub use trainer::*;
