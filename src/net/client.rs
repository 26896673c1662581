//! Authenticated API client with request/response interceptors.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every API call the app makes goes through `ApiClient::send`. The request
//! interceptor attaches the current access token; the response interceptor
//! maps non-2xx to `ApiError::Status` and hands first-attempt 401s to the
//! `RefreshCoordinator`.
//!
//! ERROR HANDLING
//! ==============
//! A request is replayed at most once. A 401 on the replay, any non-401
//! status, and transport errors (including timeouts) reach the caller
//! unchanged and never start a refresh.

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::de::DeserializeOwned;

use super::csrf::{CSRF_HEADER, fetch_csrf_token};
use super::refresh::RefreshCoordinator;
use super::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::state::session::{AuthData, SessionStore};

/// Legacy header some endpoints still read the access token from.
pub const LEGACY_TOKEN_HEADER: &str = "access_token";
pub const TESTING_LOGIN_PATH: &str = "/api/v1/testing/login";

pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: SessionStore,
    coordinator: Arc<RefreshCoordinator>,
    base_url: String,
    legacy_token_header: bool,
    in_flight: AtomicUsize,
}

impl ApiClient {
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn HttpTransport>,
        session: SessionStore,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            session,
            coordinator,
            base_url: config.base_url.clone(),
            legacy_token_header: config.legacy_token_header,
            in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests currently on the wire. Diagnostic only.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    // =========================================================================
    // PIPELINE
    // =========================================================================

    /// Send a request through the interceptors, recovering once from a 401.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` for non-2xx responses, transport errors as
    /// they occurred, or the refresh error when 401 recovery fails.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        match self.dispatch(&request).await {
            Err(err) if err.is_unauthorized() && !request.retried => {
                let mut retry = request;
                retry.retried = true;
                tracing::debug!(request_id = %retry.id, url = %retry.url, "401 received; recovering session");
                self.coordinator.recover(|| self.dispatch(&retry)).await
            }
            other => other,
        }
    }

    /// One attempt: request interceptor, transport, response interceptor.
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let _in_flight = InFlight::enter(&self.in_flight);
        let request = self.authorize(request);
        tracing::debug!(
            request_id = %request.id,
            method = %request.method,
            url = %request.url,
            retried = request.retried,
            "sending request"
        );
        let result = self.transport.send(&request).await.and_then(ApiResponse::error_for_status);
        if let Err(err) = &result {
            tracing::debug!(request_id = %request.id, error = %err, retryable = err.retryable(), "request failed");
        }
        result
    }

    /// Copy of `request` carrying the current access token, if any.
    fn authorize(&self, request: &ApiRequest) -> ApiRequest {
        let mut request = request.clone();
        if let Some(token) = self.session.token().filter(|t| !t.is_empty()) {
            if self.legacy_token_header {
                request.set_header(LEGACY_TOKEN_HEADER, token.clone());
            }
            request.set_header("Authorization", format!("Bearer {token}"));
        }
        request
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// # Errors
    ///
    /// Returns any `send` error, or `ApiError::Decode` if the body is not `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.json()
    }

    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::get(path)).await
    }

    /// Fetch a fresh CSRF token. Empty when none is available.
    pub async fn csrf_token(&self) -> String {
        fetch_csrf_token(self.transport.as_ref(), &self.base_url).await
    }

    /// Attach a freshly fetched CSRF token. Without one the request goes out
    /// unchanged and the server decides.
    pub async fn with_csrf(&self, mut request: ApiRequest) -> ApiRequest {
        let token = self.csrf_token().await;
        if token.is_empty() {
            tracing::warn!(url = %request.url, "no csrf token available; sending without it");
        } else {
            request.set_header(CSRF_HEADER, token);
        }
        request
    }

    /// Send a request with a CSRF token attached when its method changes
    /// server state. Safe methods go out without a CSRF fetch.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn send_mutation(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let request = if request.is_mutating() { self.with_csrf(request).await } else { request };
        self.send(request).await
    }

    /// Test-only login bypass: `POST /api/v1/testing/login` with `{user_id}`.
    /// Stores the returned auth data in the session.
    ///
    /// # Errors
    ///
    /// Returns transport/status errors, `ApiError::Decode` for an unexpected
    /// body, or `ApiError::MissingToken` if no access token came back.
    pub async fn testing_login(&self, user_id: &str) -> Result<AuthData, ApiError> {
        let request = ApiRequest::post(TESTING_LOGIN_PATH).json(serde_json::json!({ "user_id": user_id }));
        let request = self.with_csrf(request).await;
        let data: AuthData = self.dispatch(&request).await?.json()?;
        if data.access_token.as_deref().is_none_or(str::is_empty) {
            return Err(ApiError::MissingToken);
        }
        self.session.set_auth_data(data.clone());
        tracing::info!(user_id, role = ?data.role, "testing login succeeded");
        Ok(data)
    }
}

/// Counts a request as in flight until dropped, on every exit path.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
