//! Serving-time inference: the fixed composition of fitted stages and the
//! request type it accepts.

pub mod pipeline;
pub mod request;

pub use pipeline::*;
pub use request::*;
