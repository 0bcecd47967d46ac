//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `LM_API_BASE_URL` - Remote API origin including the `/api` prefix
//!   (default: `http://127.0.0.1:8000/api`)
//! - `LM_LOGIN_PATH` - Re-authentication entry point (default: `/login`)
//! - `LM_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `LM_CHECKOUT_DELAY_MS` - Simulated payment processing delay (default: 2500)
//! - `LM_SESSION_FILE` - Where the CLI keeps the credential
//!   (default: `$HOME/.lm-store/session.json`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_CHECKOUT_DELAY_MS: &str = "2500";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin; endpoints are appended to its path
    pub api_base_url: Url,
    /// Path the front end sends users to when they must log in again
    pub login_path: String,
    /// Timeout applied to every outbound request
    pub request_timeout: Duration,
    /// How long the simulated payment "processes" before checkout is submitted
    pub checkout_delay: Duration,
    /// Location of the persisted session credential
    pub session_file: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(&get_env_or_default(
            "LM_API_BASE_URL",
            DEFAULT_API_BASE_URL,
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("LM_API_BASE_URL".to_string(), e))?;

        let login_path = get_env_or_default("LM_LOGIN_PATH", DEFAULT_LOGIN_PATH);
        if !login_path.starts_with('/') {
            return Err(ConfigError::InvalidEnvVar(
                "LM_LOGIN_PATH".to_string(),
                "must start with '/'".to_string(),
            ));
        }

        let request_timeout = Duration::from_secs(parse_env(
            "LM_REQUEST_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        let checkout_delay = Duration::from_millis(parse_env(
            "LM_CHECKOUT_DELAY_MS",
            DEFAULT_CHECKOUT_DELAY_MS,
        )?);
        let session_file = get_optional_env("LM_SESSION_FILE")
            .map_or_else(default_session_file, PathBuf::from);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api_base_url,
            login_path,
            request_timeout,
            checkout_delay,
            session_file,
            sentry_dsn,
        })
    }

    /// Configuration pointing at an explicit API origin with defaults elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an absolute URL.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("LM_API_BASE_URL".to_string(), e))?;

        Ok(Self {
            api_base_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            request_timeout: Duration::from_secs(30),
            checkout_delay: Duration::from_millis(2500),
            session_file: default_session_file(),
            sentry_dsn: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the API origin, normalising away a trailing slash so that
/// `origin + endpoint` never produces `//`.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim_end_matches('/')).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("must be an absolute http(s) URL".to_string());
    }
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

fn default_session_file() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".lm-store")
        .join("session.json")
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a numeric environment variable with a default value.
fn parse_env(key: &str, default: &str) -> Result<u64, ConfigError> {
    get_env_or_default(key, default)
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_strips_trailing_slash() {
        let url = parse_base_url("http://127.0.0.1:8000/api/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api");
    }

    #[test]
    fn test_parse_base_url_rejects_relative() {
        assert!(parse_base_url("/api").is_err());
    }

    #[test]
    fn test_parse_base_url_rejects_non_http() {
        let err = parse_base_url("ftp://example.com/api").unwrap_err();
        assert!(err.contains("ftp"));
    }

    #[test]
    fn test_for_base_url_defaults() {
        let config = ClientConfig::for_base_url("https://shop.example.com/api").unwrap();
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.checkout_delay, Duration::from_millis(2500));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.session_file.ends_with(".lm-store/session.json"));
    }

    #[test]
    fn test_for_base_url_invalid() {
        let result = ClientConfig::for_base_url("not a url");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }
}
