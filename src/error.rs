use thiserror::Error;

use crate::types::VertexId;

/// Failure reported by the built-in triangulation engine.
///
/// These are mapped to [`TriangulationError`] at the public API boundary, where engine-order
/// node indices are translated back to the caller's ordering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("fewer than three input points")]
    TooFewPoints,
    #[error("the first three points are collinear")]
    CollinearSeed,
    #[error("nodes {first} and {second} coincide")]
    CoincidentNodes { first: VertexId, second: VertexId },
    #[error("triangulation is inconsistent: {0}")]
    Inconsistent(String),
}

/// Errors reported while building or querying a triangulation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriangulationError {
    /// A caller-supplied array does not match the mesh, or a parameter is out of range.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
    /// Fewer than three points, or no non-collinear seed could be found.
    #[error("degenerate input: {reason}")]
    DegenerateInput { reason: String },
    /// Two input points have identical coordinates. Indices refer to the caller's point order.
    #[error("points {first} and {second} coincide")]
    DuplicateNode { first: VertexId, second: VertexId },
    /// Inconsistency detected inside the triangulation engine. Not recoverable by the caller.
    #[error("internal engine failure: {reason}")]
    EngineInternal { reason: String },
}

impl TriangulationError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            reason: reason.into(),
        }
    }
}
