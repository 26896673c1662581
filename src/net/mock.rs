//! Test doubles for the transport and refresh seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

use super::client::ApiClient;
use super::refresh::{RefreshCoordinator, RefreshGrant, TokenRefresher};
use super::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::state::session::SessionStore;

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync;

// =============================================================================
// MockTransport
// =============================================================================

/// Answers every request through a closure and records what was sent.
pub(crate) struct MockTransport {
    handler: Box<Handler>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Arc::new(Self { handler: Box::new(handler), sent: Mutex::new(Vec::new()) })
    }

    /// Transport that succeeds only when the bearer token matches `token`.
    pub(crate) fn accepting_bearer(token: &'static str) -> Arc<Self> {
        Self::new(move |req| {
            let expected = format!("Bearer {token}");
            if req.header_value("Authorization") == Some(expected.as_str()) {
                Ok(ApiResponse::new(200, format!(r#"{{"url":"{}"}}"#, req.url)))
            } else {
                Ok(ApiResponse::new(401, "token expired"))
            }
        })
    }

    pub(crate) fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn sent_to(&self, url: &str) -> Vec<ApiRequest> {
        self.sent().into_iter().filter(|r| r.url == url).collect()
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        tokio::task::yield_now().await;
        (self.handler)(request)
    }
}

// =============================================================================
// MockRefresher
// =============================================================================

/// Refresher returning a scripted outcome. With a gate, each call parks
/// until the test releases it.
pub(crate) struct MockRefresher {
    outcome: Result<RefreshGrant, ApiError>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl MockRefresher {
    pub(crate) fn succeeding(token: &str) -> Arc<Self> {
        Arc::new(Self { outcome: Ok(RefreshGrant::token(token)), gate: None, calls: AtomicUsize::new(0) })
    }

    pub(crate) fn failing(err: ApiError) -> Arc<Self> {
        Arc::new(Self { outcome: Err(err), gate: None, calls: AtomicUsize::new(0) })
    }

    pub(crate) fn with_outcome(outcome: Result<RefreshGrant, ApiError>) -> Arc<Self> {
        Arc::new(Self { outcome, gate: None, calls: AtomicUsize::new(0) })
    }

    pub(crate) fn gated(outcome: Result<RefreshGrant, ApiError>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self { outcome, gate: Some(gate), calls: AtomicUsize::new(0) })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenRefresher for MockRefresher {
    async fn refresh(&self) -> Result<RefreshGrant, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}

// =============================================================================
// Client
// =============================================================================

/// `ApiClient` over `transport` with base `http://api.test` and a refresher
/// that always grants `T2`.
pub(crate) fn client_over(transport: Arc<MockTransport>) -> ApiClient {
    let session = SessionStore::new();
    let coordinator =
        Arc::new(RefreshCoordinator::new(MockRefresher::succeeding("T2"), session.clone(), Arc::new(|| {})));
    ApiClient::new(&ClientConfig::new("http://api.test"), transport, session, coordinator)
}
