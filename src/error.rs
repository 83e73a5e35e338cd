//! Error types for the rollcount library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rollcount operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or running the detection pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Image bytes or file could not be read or decoded
    #[error("Failed to decode image: {message}")]
    ImageDecode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The learned detector cannot be constructed (missing program or weights)
    #[error("Primary detector unavailable at {}: {reason}", path.display())]
    ModelUnavailable { path: PathBuf, reason: String },

    /// The detection mode needs a learned detector but none was supplied
    #[error("Detection mode {mode} requires a primary detector")]
    PrimaryRequired { mode: String },

    /// The learned detector ran but failed or produced unusable output
    #[error("Primary detector failed: {message}")]
    PrimaryDetector {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A configuration value is out of its valid range
    #[error("Invalid configuration: {parameter} = {value}")]
    InvalidConfig { parameter: String, value: String },

    /// Configuration file could not be read or parsed
    #[error("Failed to load configuration from {}", path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Writing debug artifacts failed
    #[error("Failed to write debug output {}: {message}", path.display())]
    DebugOutput { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an image decode error with context
    pub fn image_decode<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageDecode {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a primary detector error without an underlying source
    pub fn primary(message: impl Into<String>) -> Self {
        Self::PrimaryDetector {
            message: message.into(),
            source: None,
        }
    }

    /// Create a primary detector error wrapping its cause
    pub fn primary_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::PrimaryDetector {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_config(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidConfig {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }
}
