//! Raw HTTP transport seam.
//!
//! DESIGN
//! ======
//! `HttpTransport` returns every response as-is, whatever its status. Status
//! mapping and 401 recovery belong to the interceptor layer in `client`, and
//! the refresh and CSRF calls use the transport directly so they can never
//! re-enter that layer.

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::{ClientConfig, resolve_url};
use crate::error::ApiError;

// =============================================================================
// REQUEST
// =============================================================================

/// An outbound API call. Cloned for replay after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Correlates log lines for the original attempt and its replay.
    pub id: Uuid,
    pub method: Method,
    /// Absolute URL, or a path resolved against the configured base URL.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Set once the request has been replayed after a refresh.
    pub retried: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), method, url: url.into(), headers: Vec::new(), body: None, retried: false }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    #[must_use]
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    #[must_use]
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Insert or replace a header. Names compare case-insensitively.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the method changes server state and therefore wants a CSRF token.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Pass 2xx responses through; anything else becomes `ApiError::Status`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` carrying the status and body for non-2xx.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() { Ok(self) } else { Err(ApiError::Status { status: self.status, body: self.body }) }
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Sends one request and returns the response for any status. Enables mocking in tests.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::Network`, `ApiError::Timeout` or
    /// `ApiError::InvalidRequest` when no response was obtained.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// `reqwest`-backed transport with fixed timeouts and a cookie jar, so the
/// server-set refresh cookie rides along on every call.
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("http client build failed: {e}")))?;
        Ok(Self { http, base_url: config.base_url.clone() })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = resolve_url(&self.base_url, &request.url);
        let mut builder = self.http.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok(ApiResponse { status, body })
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_builder() {
        ApiError::InvalidRequest(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}
