//! Input/output helpers.
//!
//! - raw atlas structuring (`raw`)
//! - structured CSV ingest + validation (`ingest`)
//! - CSV exports (`export`)
//! - fitted artifact blobs (`artifact`)
//! - training report JSON (`report`)

pub mod artifact;
pub mod export;
pub mod ingest;
pub mod raw;
pub mod report;

pub use export::*;
pub use ingest::*;
pub use raw::*;
pub use report::*;
