//! # Stream Line Classification
//!
//! Streamed lines are kept as opaque text. A line is classified by which
//! markers it contains, not by parsing it into a typed event.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name the chat endpoint uses for complete text parts.
pub const MESSAGE_PART_EVENT: &str = "message_part";

/// Rule used to decide whether a line carries meaningful content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMatch {
    /// Any line containing `message_part` or `text`
    #[default]
    Substring,
    /// An `event: message_part` field, or a `data:` JSON object with a string `text` member
    Structured,
}

impl fmt::Display for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring => f.write_str("substring"),
            Self::Structured => f.write_str("structured"),
        }
    }
}

impl FromStr for ContentMatch {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(Self::Substring),
            "structured" => Ok(Self::Structured),
            other => Err(format!(
                "unknown content match '{other}'; expected 'substring' or 'structured'"
            )),
        }
    }
}

/// How a single streamed line affects the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// The line contains an error marker and fails the check
    Error,
    /// The line carries content
    Content,
    /// Anything else (heartbeats, session notices, blank data)
    Other,
}

/// Classifies one decoded line. Error markers win over content.
#[must_use]
pub fn classify_line(line: &str, rule: ContentMatch) -> LineClass {
    if is_error_line(line) {
        LineClass::Error
    } else if is_content_line(line, rule) {
        LineClass::Content
    } else {
        LineClass::Other
    }
}

/// Case-insensitive check for the `error` marker.
#[must_use]
pub fn is_error_line(line: &str) -> bool {
    line.to_lowercase().contains("error")
}

/// Checks a line against the given content rule.
#[must_use]
pub fn is_content_line(line: &str, rule: ContentMatch) -> bool {
    match rule {
        ContentMatch::Substring => line.contains(MESSAGE_PART_EVENT) || line.contains("text"),
        ContentMatch::Structured => is_structured_content(line),
    }
}

fn is_structured_content(line: &str) -> bool {
    if let Some(name) = line.strip_prefix("event:") {
        return name.trim() == MESSAGE_PART_EVENT;
    }

    line.strip_prefix("data:")
        .and_then(|data| serde_json::from_str::<Value>(data.trim()).ok())
        .is_some_and(|payload| payload.get("text").is_some_and(Value::is_string))
}
