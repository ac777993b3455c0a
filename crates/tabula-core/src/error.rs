//! Error types for Tabula core.

use std::path::PathBuf;

use tabula_engine::engine::{ParseError, Position};
use thiserror::Error;

/// Errors raised by sheet operations.
///
/// Every variant aborts the operation that produced it and leaves the sheet
/// exactly as it was. Evaluation problems are not errors here; they are
/// ordinary [`tabula_engine::engine::Value::Error`] results.
#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("Invalid position: {0:?}")]
    InvalidPosition(Position),

    #[error("Formula error: {0}")]
    Formula(String),

    #[error("Circular dependency detected at {0}")]
    CircularDependency(Position),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl From<ParseError> for TabulaError {
    fn from(err: ParseError) -> Self {
        TabulaError::Formula(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TabulaError>;
