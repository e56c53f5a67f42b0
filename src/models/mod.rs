//! Regression model fit on the selected features.

pub mod linear;

pub use linear::*;
