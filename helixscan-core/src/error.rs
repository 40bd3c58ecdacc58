//! Error types for helixscan

use thiserror::Error;

/// Main error type for helixscan operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Insufficient data: {valid} valid points, at least {required} required")]
    InsufficientData { valid: usize, required: usize },

    #[error("Optimization did not converge after {iterations} iterations (best error {best_error:.6})")]
    OptimizationFailure { iterations: usize, best_error: f64 },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for helixscan operations
pub type Result<T> = std::result::Result<T, Error>;
