//! Error types for the forecasting core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for forecasting operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Main error type for the forecasting core
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Insufficient data: need at least {required} aligned months, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Schema mismatch: expected columns {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Fit failure: {0}")]
    FitFailure(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Artifact {} changed while it was being read", .0.display())]
    ArtifactChanged(PathBuf),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<polars::error::PolarsError> for ForecastError {
    fn from(err: polars::error::PolarsError) -> Self {
        ForecastError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ForecastError {
    fn from(err: ndarray::ShapeError) -> Self {
        ForecastError::DataError(err.to_string())
    }
}
