//! Error types for the geoscene environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    /// Latitude/longitude outside the WGS84 domain, or not finite
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// A location estimate was rejected (non-finite position or accuracy)
    #[error("Invalid location estimate: {0}")]
    InvalidEstimate(String),

    /// No location estimate has been recorded yet
    #[error("No location estimate available")]
    NoEstimate,
}

impl EnvError {
    /// Creates an invalid coordinate error.
    pub fn coordinate(msg: impl Into<String>) -> Self {
        Self::InvalidCoordinate(msg.into())
    }

    /// Creates an invalid estimate error.
    pub fn estimate(msg: impl Into<String>) -> Self {
        Self::InvalidEstimate(msg.into())
    }
}
