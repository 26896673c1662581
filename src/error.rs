//! Error types for the session and API layer.
//!
//! ERROR HANDLING
//! ==============
//! `ApiError` is `Clone` because one refresh failure fans out to every request
//! queued behind it. Callers inspect `status()` rather than matching on
//! response bodies.

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors surfaced by API calls routed through the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The transport failed before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The fixed per-call timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("request failed with status {status}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The refresh endpoint answered without a usable access token.
    #[error("refresh response carried no access token")]
    MissingToken,

    /// The refresh call itself failed. Carries the underlying cause.
    #[error("token refresh failed: {0}")]
    RefreshFailed(Box<ApiError>),

    /// The in-flight refresh was dropped before it settled.
    #[error("token refresh abandoned before it settled")]
    RefreshAborted,

    /// A URL or header could not be built from the request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status for `Status` errors, `None` for everything else.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Whether a caller-level retry could plausibly succeed. The client itself
    /// never retries on this basis.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout | Self::Status { status: 429 | 500..=599, .. })
    }
}

/// Errors raised while reading client configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("base URL must start with http:// or https://: {0}")]
    InvalidBaseUrl(String),
}
