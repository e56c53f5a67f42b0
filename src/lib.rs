//! `obesity-predictor` library crate.
//!
//! The binary (`obp`) is a thin wrapper around this library so that:
//!
//! - the fit/inference contract is testable without spawning processes
//! - fitted stages can be embedded in other services (HTTP, batch jobs)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod inference;
pub mod io;
pub mod math;
pub mod models;
pub mod preprocess;
pub mod report;
pub mod select;
pub mod transform;

#[cfg(test)]
mod test_util;
