//! Error types for the solver crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FemError>;

/// Errors surfaced by the solving pipeline.
///
/// Errors are never recovered locally: they propagate up and abort the
/// current solve or iteration entirely. There is no partial-result mode.
#[derive(Error, Debug, Clone)]
pub enum FemError {
    /// Mismatched or non-square matrix in a utility operation.
    #[error("Dimension error: {0}")]
    Dimension(String),

    /// Index violation in matrix contraction or DOF addressing.
    #[error("Index out of range: {0}")]
    OutOfRange(String),

    /// Degenerate or misoriented element (non-positive volume).
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Invalid model setup: boundary condition referencing a DOF outside
    /// the system, or a model with no vertices/elements.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The linear-solve primitive could not produce a result.
    #[error("Solve failure: {0}")]
    Solve(String),
}
