//! Data sources: the remote atlas and the synthetic generator.

pub mod fetch;
pub mod sample;

pub use fetch::*;
pub use sample::*;
