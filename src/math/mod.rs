//! Numerical utilities: least squares and rank detection.

pub mod ols;

pub use ols::*;
