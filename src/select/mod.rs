//! Univariate feature selection (top-k by regression F-statistic).

pub mod selector;

pub use selector::*;
