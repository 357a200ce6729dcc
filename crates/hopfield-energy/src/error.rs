//! Error types for the hopfield-energy crate.
//!
//! Every fallible operation in the crate returns [`HopfieldResult`]. Validation
//! happens at construction or at the top of a recall call, so a minimization
//! loop either runs its full step budget or never starts.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building energies or running recall.
#[derive(Error, Debug)]
pub enum HopfieldError {
    /// A vector length or feature dimension does not match the stored one.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension size
        expected: usize,
        /// Actual dimension size
        actual: usize,
    },

    /// A matrix or tensor has the wrong shape.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        actual: Vec<usize>,
    },

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A state that should be bipolar holds something other than ±1.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Empty input provided.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Numerical instability detected.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// A config or checkpoint file could not be read.
    #[error("Cannot read `{path}`: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HopfieldError {
    /// Construct a [`HopfieldError::InvalidConfig`].
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        HopfieldError::InvalidConfig(msg.into())
    }

    /// Construct a [`HopfieldError::ShapeMismatch`].
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        HopfieldError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Construct a [`HopfieldError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HopfieldError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for energy and recall operations.
pub type HopfieldResult<T> = Result<T, HopfieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HopfieldError::DimensionMismatch {
            expected: 64,
            actual: 32,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 64, got 32");

        let err = HopfieldError::invalid_config("degree must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: degree must be positive"
        );

        let err = HopfieldError::shape_mismatch(&[2, 3], &[3, 2]);
        assert_eq!(
            err.to_string(),
            "Shape mismatch: expected [2, 3], got [3, 2]"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: HopfieldError = parse.unwrap_err().into();
        assert!(matches!(err, HopfieldError::Json(_)));
    }
}
