use std::{env, fmt, fs, path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::models::{
    errors::ConfigError, request::DEFAULT_MESSAGE, session::DEFAULT_SESSION_PREFIX,
    stream::ContentMatch,
};

/// Default server the check targets.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
/// Default streaming chat endpoint, relative to the base URL.
pub const DEFAULT_ENDPOINT_PATH: &str = "api/agent/chat/stream";
/// Default overall timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Largest accepted timeout in seconds (one day).
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

const ENV_BASE_URL: &str = "STREAMCHECK_BASE_URL";
const ENV_ENDPOINT_PATH: &str = "STREAMCHECK_ENDPOINT_PATH";
const ENV_MESSAGE: &str = "STREAMCHECK_MESSAGE";
const ENV_TIMEOUT_SECS: &str = "STREAMCHECK_TIMEOUT_SECS";
const ENV_LOG_LEVEL: &str = "STREAMCHECK_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "STREAMCHECK_LOG_FORMAT";

/// Output format for diagnostic logs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'; expected 'text' or 'json'")),
        }
    }
}

/// Logging settings. Logs go to stderr; stdout is reserved for the check transcript.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level directive when `RUST_LOG` is not set
    pub level: String,

    /// Log line format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Settings for one stream check run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Server base URL (scheme, host and port)
    pub base_url: String,

    /// Endpoint path joined onto the base URL
    pub endpoint_path: String,

    /// Prompt sent in the request body
    pub message: String,

    /// Prefix for generated session identifiers
    pub session_prefix: String,

    /// Fixed session identifier; generated per run when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Overall timeout covering connect, headers and the full body
    pub timeout_secs: u64,

    /// Rule deciding which lines count as content
    pub content_match: ContentMatch,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Values supplied on the command line. They take precedence over files and
/// the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub endpoint_path: Option<String>,
    pub message: Option<String>,
    pub session_id: Option<String>,
    pub timeout_secs: Option<u64>,
    pub content_match: Option<ContentMatch>,
}

impl Config {
    /// Generates a default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            session_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            content_match: ContentMatch::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// Precedence, lowest first: defaults, file, environment, `overrides`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, an environment
    /// variable is malformed, or the resolved configuration is invalid.
    pub fn load_config(
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::with_defaults(),
        };

        config.apply_env_overrides()?;
        config.apply_overrides(overrides);
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Reads a YAML or JSON configuration file. Missing fields take defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, has an unsupported
    /// extension, or fails to deserialize.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |details: String| ConfigError::Parse {
            path: path.to_path_buf(),
            details,
        };
        match extension.as_deref() {
            Some("yaml" | "yml") => {
                serde_yml::from_str(&content).map_err(|err| parse_error(err.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|err| parse_error(err.to_string()))
            }
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Applies `STREAMCHECK_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparsable value.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| env::var(name).ok())
    }

    fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(path) = lookup(ENV_ENDPOINT_PATH) {
            self.endpoint_path = path;
        }
        if let Some(message) = lookup(ENV_MESSAGE) {
            self.message = message;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = timeout.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_TIMEOUT_SECS.to_string(),
                value: timeout.clone(),
                details: "must be a whole number of seconds".to_string(),
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.logging.format = format.parse().map_err(|details| ConfigError::InvalidEnv {
                var: ENV_LOG_FORMAT.to_string(),
                value: format.clone(),
                details,
            })?;
        }
        Ok(())
    }

    /// Applies command-line overrides.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(base_url) = &overrides.base_url {
            self.base_url.clone_from(base_url);
        }
        if let Some(path) = &overrides.endpoint_path {
            self.endpoint_path.clone_from(path);
        }
        if let Some(message) = &overrides.message {
            self.message.clone_from(message);
        }
        if let Some(session_id) = &overrides.session_id {
            self.session_id = Some(session_id.clone());
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(rule) = overrides.content_match {
            self.content_match = rule;
        }
    }

    /// Full URL of the streaming endpoint.
    ///
    /// # Errors
    /// Returns an error if the base URL or path cannot be parsed.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let invalid = |details: String| ConfigError::InvalidUrl {
            value: self.base_url.clone(),
            details,
        };
        let base = Url::parse(&base).map_err(|err| invalid(err.to_string()))?;
        base.join(self.endpoint_path.trim_start_matches('/'))
            .map_err(|err| invalid(err.to_string()))
    }

    /// Endpoint path as displayed in the transcript, always with a leading slash.
    #[must_use]
    pub fn display_path(&self) -> String {
        format!("/{}", self.endpoint_path.trim_start_matches('/'))
    }

    /// Overall timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the configuration, collecting every problem found.
    ///
    /// # Errors
    /// Returns the list of validation messages when any rule fails.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.timeout_secs == 0 {
            errors.push("timeout_secs must be greater than 0".to_string());
        } else if self.timeout_secs > MAX_TIMEOUT_SECS {
            errors.push(format!(
                "timeout_secs must be at most {MAX_TIMEOUT_SECS}, got {}",
                self.timeout_secs
            ));
        }

        if self.endpoint_path.trim_matches('/').is_empty() {
            errors.push("endpoint_path must not be empty".to_string());
        }

        match self.endpoint_url() {
            Ok(url) if !matches!(url.scheme(), "http" | "https") => {
                errors.push(format!(
                    "base_url must use http or https, got '{}'",
                    url.scheme()
                ));
            }
            Ok(_) => {}
            Err(err) => errors.push(err.to_string()),
        }

        if self.session_id.is_none() && self.session_prefix.is_empty() {
            errors.push("session_prefix must not be empty".to_string());
        }

        if self.logging.level.parse::<LevelFilter>().is_err() {
            errors.push(format!("Invalid log level: {}", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn cleanup_env_vars() {
        unsafe {
            for var in [
                ENV_BASE_URL,
                ENV_ENDPOINT_PATH,
                ENV_MESSAGE,
                ENV_TIMEOUT_SECS,
                ENV_LOG_LEVEL,
                ENV_LOG_FORMAT,
            ] {
                std::env::remove_var(var);
            }
        }
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_with_defaults() {
        let config = Config::with_defaults();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.endpoint_path, "api/agent/chat/stream");
        assert_eq!(config.message, "Hello, who are you?");
        assert_eq!(config.session_prefix, "test-session-");
        assert_eq!(config.session_id, None);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.content_match, ContentMatch::Substring);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_endpoint_url() {
        let config = Config::with_defaults();
        assert_eq!(
            config.endpoint_url().unwrap().as_str(),
            "http://localhost:8080/api/agent/chat/stream"
        );
        assert_eq!(config.display_path(), "/api/agent/chat/stream");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_url_keeps_base_prefix_and_tolerates_slashes() {
        let config = Config {
            base_url: "https://example.com/proxy/".to_string(),
            endpoint_path: "/api/agent/chat/stream".to_string(),
            ..Config::with_defaults()
        };
        assert_eq!(
            config.endpoint_url().unwrap().as_str(),
            "https://example.com/proxy/api/agent/chat/stream"
        );
    }

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        cleanup_env_vars();
        let config = Config::load_config(None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config, Config::with_defaults());
    }

    #[test]
    #[serial]
    fn test_load_config_from_yaml_file() {
        cleanup_env_vars();
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("streamcheck.yaml");
        fs::write(
            &config_file,
            r#"
base_url: "http://127.0.0.1:9000"
message: "ping"
timeout_secs: 5
content_match: structured
"#,
        )
        .unwrap();

        let config = Config::load_config(Some(&config_file), &ConfigOverrides::default()).unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.message, "ping");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.content_match, ContentMatch::Structured);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.endpoint_path, DEFAULT_ENDPOINT_PATH);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_config_from_json_file() {
        cleanup_env_vars();
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("streamcheck.json");
        fs::write(
            &config_file,
            r#"{"session_id": "fixed", "logging": {"level": "debug", "format": "json"}}"#,
        )
        .unwrap();

        let config = Config::load_config(Some(&config_file), &ConfigOverrides::default()).unwrap();

        assert_eq!(config.session_id.as_deref(), Some("fixed"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("streamcheck.toml");
        fs::write(&config_file, "timeout_secs = 5").unwrap();

        let result = Config::from_file(&config_file);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::from_file(&temp_dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("broken.json");
        fs::write(&config_file, "{ not json").unwrap();

        let result = Config::from_file(&config_file);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides_from_lookup() {
        let mut config = Config::with_defaults();
        config
            .apply_overrides_from(lookup_from(&[
                (ENV_BASE_URL, "http://10.0.0.5:8081"),
                (ENV_ENDPOINT_PATH, "chat/stream"),
                (ENV_MESSAGE, "status?"),
                (ENV_TIMEOUT_SECS, " 12 "),
                (ENV_LOG_LEVEL, "debug"),
                (ENV_LOG_FORMAT, "JSON"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "http://10.0.0.5:8081");
        assert_eq!(config.endpoint_path, "chat/stream");
        assert_eq!(config.message, "status?");
        assert_eq!(config.timeout_secs, 12);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_env_timeout() {
        let mut config = Config::with_defaults();
        let result = config.apply_overrides_from(lookup_from(&[(ENV_TIMEOUT_SECS, "soon")]));

        let err = result.unwrap_err();
        assert!(err.to_string().contains("STREAMCHECK_TIMEOUT_SECS"));
    }

    #[test]
    #[serial]
    fn test_load_config_with_environment_variables() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var(ENV_BASE_URL, "http://127.0.0.1:7000");
            std::env::set_var(ENV_TIMEOUT_SECS, "3");
        }

        let config = Config::load_config(None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:7000");
        assert_eq!(config.timeout_secs, 3);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_command_line_overrides_take_precedence() {
        cleanup_env_vars();
        unsafe {
            std::env::set_var(ENV_TIMEOUT_SECS, "3");
        }

        let overrides = ConfigOverrides {
            base_url: Some("http://127.0.0.1:6000".to_string()),
            session_id: Some("manual".to_string()),
            timeout_secs: Some(9),
            content_match: Some(ContentMatch::Structured),
            ..ConfigOverrides::default()
        };
        let config = Config::load_config(None, &overrides).unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:6000");
        assert_eq!(config.session_id.as_deref(), Some("manual"));
        assert_eq!(config.timeout_secs, 9);
        assert_eq!(config.content_match, ContentMatch::Structured);

        cleanup_env_vars();
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let config = Config {
            base_url: "ftp://files.example.com".to_string(),
            timeout_secs: 0,
            logging: LoggingConfig {
                level: "chatty".to_string(),
                format: LogFormat::Text,
            },
            ..Config::with_defaults()
        };

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("timeout_secs")));
        assert!(errors.iter().any(|e| e.contains("http or https")));
        assert!(errors.iter().any(|e| e.contains("Invalid log level")));
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_zero_timeout() {
        cleanup_env_vars();
        let overrides = ConfigOverrides {
            timeout_secs: Some(0),
            ..ConfigOverrides::default()
        };
        let err = Config::load_config(None, &overrides).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_oversized_timeout() {
        cleanup_env_vars();
        let overrides = ConfigOverrides {
            timeout_secs: Some(u64::MAX),
            ..ConfigOverrides::default()
        };
        let err = Config::load_config(None, &overrides).unwrap_err();
        assert!(err.to_string().contains("timeout_secs must be at most 86400"));

        let at_limit = Config {
            timeout_secs: MAX_TIMEOUT_SECS,
            ..Config::with_defaults()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_unparsable_base_url() {
        let config = Config {
            base_url: "not a url".to_string(),
            ..Config::with_defaults()
        };
        assert!(matches!(
            config.endpoint_url(),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialized_defaults_round_trip_through_yaml() {
        let yaml = serde_yml::to_string(&Config::with_defaults()).unwrap();
        assert!(yaml.contains("base_url"));
        assert!(!yaml.contains("session_id"));
        let parsed: Config = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed, Config::with_defaults());
    }
}
