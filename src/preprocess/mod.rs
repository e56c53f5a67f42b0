//! Mean imputation followed by standardization.

pub mod preprocessor;

pub use preprocessor::*;
