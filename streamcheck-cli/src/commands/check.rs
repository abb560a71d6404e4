//! The `check` command: one POST to the streaming chat endpoint, read line by
//! line until the stream ends or a line disqualifies the run.

use std::{error::Error as StdError, path::PathBuf, time::Duration};

use clap::Args;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode, Url, header::ACCEPT};
use shared::{
    config::check::{Config, ConfigOverrides, MAX_TIMEOUT_SECS},
    models::{
        ChatStreamRequest, ConfigError, ContentMatch, FailureReason, LineClass, Outcome,
        SessionId, StreamCheckError, classify_line,
    },
};
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, debug, info_span, warn};

use crate::{lines::SseLines, tracer};

#[derive(Args, Debug, Default, Clone)]
#[command(about = "Send one chat request and verify the streamed response")]
pub struct CheckArgs {
    /// Path to a configuration file (yaml or json)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Server base URL (default: <http://localhost:8080>)
    #[arg(long)]
    pub server: Option<String>,

    /// Endpoint path relative to the server URL (default: api/agent/chat/stream)
    #[arg(long)]
    pub path: Option<String>,

    /// Prompt to send
    #[arg(long, short)]
    pub message: Option<String>,

    /// Fixed session identifier instead of a generated one
    #[arg(long)]
    pub session_id: Option<String>,

    /// Overall timeout in seconds (default: 30)
    #[arg(long, short)]
    pub timeout: Option<u64>,

    /// Which lines count as content: substring or structured
    #[arg(long)]
    pub content_match: Option<ContentMatch>,
}

impl CheckArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.server.clone(),
            endpoint_path: self.path.clone(),
            message: self.message.clone(),
            session_id: self.session_id.clone(),
            timeout_secs: self.timeout,
            content_match: self.content_match,
        }
    }
}

/// Resolves configuration, runs the check and prints the verdict.
pub async fn handle_check(args: &CheckArgs) -> Outcome {
    let config = match Config::load_config(args.config.as_deref(), &args.overrides()) {
        Ok(config) => config,
        Err(err) => {
            let outcome = Outcome::from(StreamCheckError::from(err));
            report(&outcome);
            return outcome;
        }
    };

    tracer::initialize_tracing(&config.logging);
    log_resolved(&config);

    let outcome = match StreamCheck::from_config(&config) {
        Ok(check) => {
            debug!(session_id = %check.session_id(), "starting stream check");
            check.run().await
        }
        Err(err) => Outcome::from(err),
    };
    report(&outcome);
    outcome
}

fn log_resolved(config: &Config) {
    debug!(
        endpoint = %config.endpoint_path,
        base_url = %config.base_url,
        timeout_secs = config.timeout_secs,
        content_match = %config.content_match,
        "configuration resolved"
    );
}

/// One end-to-end request against a streaming chat endpoint.
#[derive(Debug)]
pub struct StreamCheck {
    client: Client,
    endpoint: Url,
    display_path: String,
    message: String,
    session_id: SessionId,
    timeout: Duration,
    content_match: ContentMatch,
}

impl StreamCheck {
    /// Builds the HTTP client and picks the session identifier for this run.
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid or the client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, StreamCheckError> {
        let endpoint = config.endpoint_url()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent("streamcheck")
            .build()
            .map_err(|err| StreamCheckError::transport(error_chain(&err)))?;
        let session_id = config.session_id.clone().map_or_else(
            || SessionId::generate(&config.session_prefix),
            SessionId::new,
        );

        Ok(Self {
            client,
            endpoint,
            display_path: config.display_path(),
            message: config.message.clone(),
            session_id,
            timeout: config.timeout(),
            content_match: config.content_match,
        })
    }

    /// Session identifier sent with this run's request.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Runs the check. Every failure, including transport errors, comes back
    /// as [`Outcome::Failure`].
    pub async fn run(&self) -> Outcome {
        println!("Testing {}...", self.display_path);

        let span = info_span!(
            "stream_check",
            endpoint = %self.endpoint,
            session_id = %self.session_id
        );
        match self.consume().instrument(span).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "stream check aborted");
                Outcome::from(err)
            }
        }
    }

    async fn consume(&self) -> Result<Outcome, StreamCheckError> {
        let timeout_secs = self.timeout.as_secs();
        let deadline = Instant::now().checked_add(self.timeout).ok_or_else(|| {
            ConfigError::Invalid(vec![format!(
                "timeout_secs must be at most {MAX_TIMEOUT_SECS}, got {timeout_secs}"
            )])
        })?;
        let payload = ChatStreamRequest::new(self.message.clone(), self.session_id.clone());

        debug!("sending chat stream request");
        let request = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "text/event-stream")
            .json(&payload)
            .send();
        let response = timeout_at(deadline, request)
            .await
            .map_err(|_| StreamCheckError::Timeout {
                seconds: timeout_secs,
            })?
            .map_err(|err| transport_error(&err, timeout_secs))?;

        let status = response.status();
        debug!(status = status.as_u16(), "response received");
        if status != StatusCode::OK {
            let body = timeout_at(deadline, response.text())
                .await
                .ok()
                .and_then(Result::ok)
                .unwrap_or_default();
            warn!(status = status.as_u16(), "endpoint rejected request");
            return Ok(Outcome::Failure(FailureReason::Status {
                status: status.as_u16(),
                body,
            }));
        }

        println!("Connected to SSE stream. Receiving events...");
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|err| transport_error(&err, timeout_secs)));
        let mut lines = SseLines::new(Box::pin(body), deadline, timeout_secs);

        let mut line_count = 0;
        let mut content_lines = 0;
        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }
            line_count += 1;
            println!("Event: {line}");

            match classify_line(&line, self.content_match) {
                LineClass::Error => {
                    warn!(line = %line, "error marker in stream");
                    return Ok(Outcome::Failure(FailureReason::ErrorMarker { line }));
                }
                LineClass::Content => content_lines += 1,
                LineClass::Other => {}
            }
            debug!(line_count, content_lines, "line processed");
        }

        if content_lines == 0 {
            warn!(line_count, "stream ended without content");
            return Ok(Outcome::Failure(FailureReason::NoContent));
        }

        Ok(Outcome::Success {
            lines: line_count,
            content_lines,
        })
    }
}

/// Prints the final verdict to stdout.
pub fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Success { .. } => {
            println!("SUCCESS: SSE stream completed successfully");
            println!();
            println!("All tests passed!");
        }
        Outcome::Failure(reason) => {
            println!("FAILED: {reason}");
            if let FailureReason::Status { body, .. } = reason {
                println!("{body}");
            }
        }
    }
}

fn transport_error(err: &reqwest::Error, timeout_secs: u64) -> StreamCheckError {
    if err.is_timeout() {
        StreamCheckError::Timeout {
            seconds: timeout_secs,
        }
    } else {
        StreamCheckError::transport(error_chain(err))
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
