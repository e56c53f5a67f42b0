//! Traits implemented by fitted artifacts.
//!
//! The inference pipeline is generic over these so tests can substitute
//! stand-in stages. Implementations must be pure: `transform`/`predict` take
//! `&self` and never mutate the artifact, which is what allows one loaded
//! pipeline to serve concurrent requests without locking.

use crate::domain::FeatureVector;
use crate::error::PipelineError;

/// A fitted, immutable feature transform.
pub trait FittedTransform: Send + Sync {
    /// Fields accepted by `transform`, in order.
    fn input_fields(&self) -> &[String];

    /// Fields produced by `transform`, in order.
    fn output_fields(&self) -> &[String];

    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PipelineError>;
}

/// A fitted, immutable regression model.
pub trait Regressor: Send + Sync {
    /// Fields the model was fit on, in order.
    fn fields(&self) -> &[String];

    fn predict(&self, features: &FeatureVector) -> Result<f64, PipelineError>;
}
