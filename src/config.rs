//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API origin without a trailing slash, e.g. `http://localhost:8000`.
    pub base_url: String,
    pub timeouts: ClientTimeouts,
    /// Also send the token in the legacy `access_token` header.
    pub legacy_token_header: bool,
}

impl ClientConfig {
    /// Config with default timeouts for the given API origin.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeouts: ClientTimeouts::default(),
            legacy_token_header: true,
        }
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `JOBBOARD_API_BASE_URL`: default `http://localhost:8000`
    /// - `JOBBOARD_REQUEST_TIMEOUT_SECS`: default 10
    /// - `JOBBOARD_CONNECT_TIMEOUT_SECS`: default 5
    /// - `JOBBOARD_LEGACY_TOKEN_HEADER`: default `true`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or the legacy-header
    /// flag is not a recognised boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("JOBBOARD_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let base_url = normalize_base_url(&base_url)?;

        let timeouts = ClientTimeouts {
            request_secs: parse_u64(lookup("JOBBOARD_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup("JOBBOARD_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        let legacy_token_header = match lookup("JOBBOARD_LEGACY_TOKEN_HEADER") {
            None => true,
            Some(raw) => parse_bool(&raw)
                .ok_or(ConfigError::InvalidValue { var: "JOBBOARD_LEGACY_TOKEN_HEADER", value: raw })?,
        };

        Ok(Self { base_url, timeouts, legacy_token_header })
    }

    /// Replace the API origin, applying the same validation as `from_env`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if `base_url` is not http(s).
    pub fn with_base_url(self, base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self { base_url: normalize_base_url(base_url)?, ..self })
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        resolve_url(&self.base_url, path)
    }
}

/// Join `path` onto `base`. Absolute URLs pass through unchanged.
#[must_use]
pub fn resolve_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let base_url = raw.trim().trim_end_matches('/').to_owned();
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        Ok(base_url)
    } else {
        Err(ConfigError::InvalidBaseUrl(base_url))
    }
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
