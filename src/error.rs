//! Error types.
//!
//! Two layers:
//!
//! - [`TpcError`]: the fitting core's typed taxonomy (bad inputs, bad sampling
//!   bounds, a curve that could not be fitted at all)
//! - [`FitFailure`]: why a *single* optimizer attempt was discarded; this is
//!   recorded in the attempt's result and never propagated with `?`
//!
//! The binary wraps both in [`AppError`], which carries a process exit code.

use crate::domain::ParamName;

/// Fatal errors raised by the fitting core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TpcError {
    /// Malformed, missing or non-positive temperature / trait data, or a
    /// parameter set that lacks a parameter the model needs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("parameter names {params:?} do not match sampling bound names {bounds:?}")]
    BoundsMismatch {
        params: Vec<ParamName>,
        bounds: Vec<ParamName>,
    },

    #[error("invalid sampling bounds for {name}: {reason}")]
    InvalidBounds { name: ParamName, reason: String },

    /// Every resampling attempt for a curve failed.
    #[error("curve '{curve_id}': none of {attempts} fit attempts converged")]
    NoConvergence { curve_id: String, attempts: usize },
}

/// Why one optimizer attempt was discarded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitFailure {
    #[error("optimizer did not converge: {0}")]
    NotConverged(String),

    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("singular Jacobian at solution (rank {rank} of {free})")]
    SingularJacobian { rank: usize, free: usize },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<TpcError> for AppError {
    fn from(err: TpcError) -> Self {
        let exit_code = match err {
            TpcError::InvalidInput(_) | TpcError::BoundsMismatch { .. } | TpcError::InvalidBounds { .. } => 2,
            TpcError::NoConvergence { .. } => 3,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
