//! # Models
//!
//! Request payload, session identifiers, stream classification and outcomes.

pub mod errors;
pub mod outcome;
pub mod request;
pub mod session;
pub mod stream;

pub use errors::{ConfigError, StreamCheckError};
pub use outcome::{FailureReason, Outcome};
pub use request::ChatStreamRequest;
pub use session::SessionId;
pub use stream::{ContentMatch, LineClass, classify_line};
