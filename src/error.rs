//! Errors raised along the load → formulate → solve → verify pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClspError>;

#[derive(Debug, Error)]
pub enum ClspError {
    /// Malformed or inconsistent instance input
    #[error("invalid instance data: {0}")]
    Data(String),

    /// Inconsistency detected while building the MIP
    #[error("cannot formulate model: {0}")]
    Model(String),

    #[error("solver failed: {0}")]
    Solver(#[from] SolverFailure),

    /// Recomputed capacity, cost or balance disagrees with the solver
    #[error("solution verification failed: {0}")]
    Verification(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ClspError {
    /// The pipeline stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            ClspError::Data(_) | ClspError::Io(_) | ClspError::Json(_) => "load",
            ClspError::Model(_) => "formulate",
            ClspError::Solver(_) => "solve",
            ClspError::Verification(_) => "verify",
            ClspError::Csv(_) => "report",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverFailure {
    #[error("model proven infeasible")]
    Infeasible,
    #[error("{0}")]
    Internal(String),
}
