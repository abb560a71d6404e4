use std::fmt;

use super::errors::StreamCheckError;

/// Why a check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The endpoint answered with a non-success status; the stream was not read
    Status { status: u16, body: String },
    /// A streamed line contained an error marker
    ErrorMarker { line: String },
    /// The stream ended without any content line
    NoContent,
    /// Connection, timeout, or decode failure
    Transport { message: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, .. } => write!(f, "Status code {status}"),
            Self::ErrorMarker { line } => write!(f, "Error in stream: {line}"),
            Self::NoContent => f.write_str("No content received in stream"),
            Self::Transport { message } => write!(f, "Exception occurred: {message}"),
        }
    }
}

impl From<StreamCheckError> for FailureReason {
    fn from(error: StreamCheckError) -> Self {
        Self::Transport {
            message: error.to_string(),
        }
    }
}

/// Result of a single stream check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// At least one content line arrived and no error marker was seen
    Success {
        /// Non-empty lines read
        lines: usize,
        /// Lines that matched the content rule
        content_lines: usize,
    },
    /// The check failed
    Failure(FailureReason),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Process exit code: `0` on success, `1` on any failure.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Failure(reason) => Some(reason),
            Self::Success { .. } => None,
        }
    }
}

impl From<StreamCheckError> for Outcome {
    fn from(error: StreamCheckError) -> Self {
        Self::Failure(error.into())
    }
}
