//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the canonical field schema (`InputField`, `FieldKind`)
//! - county records in model units (`StructuredRecord`)
//! - stage-tagged feature containers (`FeatureVector`, `FeatureMatrix`)

pub mod features;
pub mod schema;
pub mod types;

pub use features::*;
pub use schema::*;
pub use types::*;
