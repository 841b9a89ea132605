//! Error types and handling for imgbatch

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for imgbatch operations
pub type Result<T> = std::result::Result<T, ImgBatchError>;

/// Main error type for imgbatch operations
#[derive(Debug, Error)]
pub enum ImgBatchError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// HTTP transport or status errors
    #[error("{0}")]
    HttpError(#[from] reqwest::Error),

    /// Runner or worker settings that cannot be honoured
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Configuration file errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Input folder or URL list missing or unreadable
    #[error("Input not found: {path:?} ({message})")]
    InputNotFound { path: PathBuf, message: String },

    /// External conversion tool could not be run or reported failure
    #[error("{program} {message}")]
    ProcessError { program: String, message: String },

    /// An item that cannot be processed at all (bad URL, no file name)
    #[error("{message}")]
    InvalidItem { message: String },

    /// Parallel processing errors
    #[error("Parallel processing error: {message}")]
    ParallelError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl ImgBatchError {
    /// Create a new invalid configuration error
    pub fn invalid_configuration<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a new configuration file error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new input not found error
    pub fn input_not_found<S: Into<String>>(path: PathBuf, message: S) -> Self {
        Self::InputNotFound {
            path,
            message: message.into(),
        }
    }

    /// Create a new external process error
    pub fn process<P: Into<String>, S: Into<String>>(program: P, message: S) -> Self {
        Self::ProcessError {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid item error
    pub fn invalid_item<S: Into<String>>(message: S) -> Self {
        Self::InvalidItem {
            message: message.into(),
        }
    }

    /// Create a new parallel processing error
    pub fn parallel<S: Into<String>>(message: S) -> Self {
        Self::ParallelError {
            message: message.into(),
        }
    }

    /// Check if this error must stop the run before any item is processed
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidConfiguration { .. }
            | Self::ConfigError { .. }
            | Self::InputNotFound { .. }
            | Self::ParallelError { .. }
            | Self::SerdeError(_) => true,

            // These affect a single item; the batch carries on
            Self::IoError(_)
            | Self::HttpError(_)
            | Self::ProcessError { .. }
            | Self::InvalidItem { .. } => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::InputNotFound { path, message } => {
                format!("Cannot read input {}: {}", path.display(), message)
            }
            Self::InvalidConfiguration { message } => {
                format!("{}. Use a thread count of at least 1.", message)
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for ImgBatchError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for ImgBatchError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}
