//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `QKART_API_ENDPOINT` - Backend base URL (default: `http://localhost:8082/api/v1`)
//! - `QKART_SEARCH_DEBOUNCE_MS` - Quiet period before a search fires (default: 500)
//! - `QKART_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: none, wait indefinitely)
//! - `QKART_SESSION_FILE` - Where the auth token is persisted
//!   (default: `<config dir>/qkart/session.json`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_ENDPOINT: &str = "http://localhost:8082/api/v1";
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;
const SESSION_FILE_NAME: &str = "session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL every endpoint path is appended to
    pub api_endpoint: Url,
    /// Quiet period the search debouncer waits for
    pub search_debounce: Duration,
    /// Optional per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// File backing the persisted session
    pub session_file: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed, or
    /// if no session file location can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_endpoint = parse_endpoint(
            "QKART_API_ENDPOINT",
            &get_env_or_default("QKART_API_ENDPOINT", DEFAULT_API_ENDPOINT),
        )?;

        let search_debounce = Duration::from_millis(
            get_env_or_default(
                "QKART_SEARCH_DEBOUNCE_MS",
                &DEFAULT_SEARCH_DEBOUNCE_MS.to_string(),
            )
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("QKART_SEARCH_DEBOUNCE_MS".to_string(), e.to_string())
            })?,
        );

        let request_timeout = get_optional_env("QKART_REQUEST_TIMEOUT_SECS")
            .map(|secs| {
                secs.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "QKART_REQUEST_TIMEOUT_SECS".to_string(),
                        e.to_string(),
                    )
                })
            })
            .transpose()?;

        let session_file = match get_optional_env("QKART_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_session_file()?,
        };

        Ok(Self {
            api_endpoint,
            search_debounce,
            request_timeout,
            session_file,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration pointing at `api_endpoint` with every other setting at
    /// its default.
    #[must_use]
    pub fn with_endpoint(api_endpoint: Url, session_file: PathBuf) -> Self {
        Self {
            api_endpoint,
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            request_timeout: None,
            session_file,
            sentry_dsn: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the API endpoint, normalizing it to end in `/` so relative joins
/// append rather than replace the last path segment.
fn parse_endpoint(key: &str, value: &str) -> Result<Url, ConfigError> {
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };

    let url = Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    Ok(url)
}

/// Default session file under the user's config directory.
fn default_session_file() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("qkart").join(SESSION_FILE_NAME))
        .ok_or_else(|| ConfigError::MissingEnvVar("QKART_SESSION_FILE".to_string()))
}
