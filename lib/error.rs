//! Crate-wide error type.
//!
//! Only configuration problems are errors. Numerical degeneracies in the
//! solvers are handled locally with documented fallback values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EitError {
    #[error("unknown sweep parameter '{0}'")]
    UnknownParameter(String),

    #[error("shape mismatch in {field}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("invalid sweep: {0}")]
    InvalidSweep(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown isotope '{0}'; must be Rb87 or Rb85")]
    UnknownIsotope(String),

    #[error("level '{0}' not found")]
    LevelNotFound(String),

    #[error("transition {lower} -> {upper} not found")]
    TransitionNotFound { lower: String, upper: String },

    #[error("invalid double-lambda configuration: {0}")]
    InvalidSystem(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Npz(#[from] ndarray_npy::WriteNpzError),

    #[error(transparent)]
    Linalg(#[from] ndarray_linalg::error::LinalgError),
}

pub type EitResult<T> = Result<T, EitError>;
