//! Errors raised by the placement engine.

use geoscene_env::{EnvError, NodeHandle};
use thiserror::Error;

/// Errors that can occur while projecting, building or placing nodes.
///
/// Only malformed static inputs surface to callers. Transient tracking gaps
/// (`MissingReferenceData`) are absorbed by the update loop, and degenerate
/// scales are clamped where they arise.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    /// The reference frame lacks a field the operation needs.
    #[error("Missing reference data: {0}")]
    MissingReferenceData(&'static str),

    /// Boundary or dimension input cannot form a solid.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A scaling scheme produced a non-positive or non-finite factor.
    #[error("Degenerate scale {value} from scheme {scheme}")]
    DegenerateScale { scheme: &'static str, value: f64 },

    /// No node is registered under this handle.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeHandle),

    /// Environment-layer failure (e.g. an invalid coordinate).
    #[error(transparent)]
    Environment(#[from] EnvError),
}

impl PlacementError {
    /// Creates an invalid geometry error.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// True for errors the update loop treats as "try again next tick".
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::MissingReferenceData(_))
    }
}

/// Result alias for the placement engine.
pub type PlacementResult<T> = Result<T, PlacementError>;
