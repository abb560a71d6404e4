//! # Error Types
//!
//! Errors raised while loading configuration or running a stream check.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while resolving a [`crate::config::check::Config`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file extension is not `yaml`, `yml` or `json`
    #[error("Unsupported configuration format for {}. Use 'yaml' or 'json'.", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The configuration file could not be deserialized
    #[error("Failed to parse configuration file {}: {details}", .path.display())]
    Parse { path: PathBuf, details: String },

    /// An environment variable held a value that could not be parsed
    #[error("Invalid {var} value '{value}': {details}")]
    InvalidEnv {
        var: String,
        value: String,
        details: String,
    },

    /// The base URL or endpoint path does not form a valid URL
    #[error("Invalid endpoint URL '{value}': {details}")]
    InvalidUrl { value: String, details: String },

    /// One or more validation rules failed
    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Errors raised while talking to the streaming endpoint.
///
/// The check command never lets these escape: each one is turned into a
/// failed outcome whose message is the error's display text.
#[derive(Error, Debug)]
pub enum StreamCheckError {
    /// Configuration could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The overall deadline elapsed before the stream finished
    #[error("Operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// A streamed line was not valid UTF-8
    #[error("Stream decode error: {details}")]
    Decode { details: String },

    /// Connection, request, or body transfer failed
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl StreamCheckError {
    /// Create a new transport error
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode<T: Into<String>>(details: T) -> Self {
        Self::Decode {
            details: details.into(),
        }
    }
}
