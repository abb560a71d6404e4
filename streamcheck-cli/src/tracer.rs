//! Tracing subscriber setup. Diagnostics go to stderr; stdout carries the
//! check transcript.

use shared::config::check::{LogFormat, LoggingConfig};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

/// Initializes the tracing subscriber. Logs are written to stderr so the
/// check transcript on stdout stays clean.
///
/// Does nothing if a global subscriber is already installed.
pub fn initialize_tracing(logging: &LoggingConfig) {
    let fmt_builder = fmt::fmt()
        .with_env_filter(build_env_filter(logging))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let result = if matches!(logging.format, LogFormat::Json) {
        fmt_builder.json().with_ansi(false).try_init()
    } else {
        fmt_builder.with_ansi(true).try_init()
    };

    if let Err(err) = result {
        eprintln!("warning: tracing already initialized: {err}");
    }
}

fn build_env_filter(logging: &LoggingConfig) -> EnvFilter {
    let default_level = logging
        .level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::WARN);

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .parse_lossy("")
    })
}
