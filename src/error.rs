//! Error module for the PSE engine.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum PseError {
    /// Error for invalid parameter values, e.g., an empty sweep axis.
    InvalidParameter(String),
    /// Error for a swept attribute name with no setter on the configuration type.
    UnknownParameter(String),
    /// Error for a metric name outside the catalog.
    UnknownMetric(String),
    /// Error for constructing a configuration sequence from an unfinalized template.
    UnconfiguredTemplate,
    /// Error raised by a simulation backend while executing one configuration.
    BackendError(String),
    /// Error for mismatched shapes, e.g., a metric vector shorter than the metric list.
    ShapeMismatch(String),
    /// Error for I/O operations.
    IoError(String),
}

impl fmt::Display for PseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PseError::InvalidParameter(e) => write!(f, "Invalid parameter: {}", e),
            PseError::UnknownParameter(e) => write!(f, "Unknown sweep parameter: {}", e),
            PseError::UnknownMetric(e) => write!(f, "Unknown metric: {}", e),
            PseError::UnconfiguredTemplate => write!(
                f,
                "The template configuration must be configured before building a sequence"
            ),
            PseError::BackendError(e) => write!(f, "Backend execution error: {}", e),
            PseError::ShapeMismatch(e) => write!(f, "Shape mismatch: {}", e),
            PseError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for PseError {}
