use serde::{Deserialize, Serialize};

use super::session::SessionId;

/// Default prompt sent to the chat endpoint.
pub const DEFAULT_MESSAGE: &str = "Hello, who are you?";

/// JSON body posted to the streaming chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStreamRequest {
    /// Prompt text
    pub message: String,

    /// Session identifier correlating this run with server-side state
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
}

impl ChatStreamRequest {
    /// Creates a request for the given prompt and session.
    pub fn new(message: impl Into<String>, session_id: SessionId) -> Self {
        Self {
            message: message.into(),
            session_id,
        }
    }
}
