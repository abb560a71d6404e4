use std::{
    fmt,
    sync::atomic::{AtomicI64, Ordering},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Default prefix for generated session identifiers.
pub const DEFAULT_SESSION_PREFIX: &str = "test-session-";

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Per-run session identifier sent as `sessionID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates `<prefix><unix_timestamp_millis>`.
    ///
    /// Two calls in the same process never return the same timestamp, even
    /// when they land in the same millisecond.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let timestamp = next_timestamp(Utc::now().timestamp_millis());
        Self(format!("{prefix}{timestamp}"))
    }

    /// Wraps an identifier supplied by the caller.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

fn next_timestamp(now: i64) -> i64 {
    let mut last = LAST_TIMESTAMP.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_TIMESTAMP.compare_exchange_weak(
            last,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}
