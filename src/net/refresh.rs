//! Token refresh call and the single-flight refresh coordinator.
//!
//! ARCHITECTURE
//! ============
//! The coordinator is a two-state machine (`idle`, `refreshing`) guarded by a
//! mutex that is never held across an await. The first request to hit a 401
//! while idle becomes the leader: it flips the state, calls the refresh
//! endpoint, and settles the outcome. Requests that hit a 401 while the leader
//! is in flight park on a oneshot receiver in FIFO order.
//!
//! On success the leader stores the new token, flips back to idle, releases
//! every parked request (each replays itself with the new token), and only
//! then replays its own request. On failure every parked request receives the
//! refresh error, the session-expired callback runs once, and the leader
//! returns the same error. No refresh is ever retried.
//!
//! TRADE-OFFS
//! ==========
//! The session-expired callback is injected at construction rather than
//! calling the route guard directly, which keeps `net` free of any
//! dependency on navigation. A drop guard settles parked requests with
//! `RefreshAborted` if the leader's future is cancelled mid-refresh, so a
//! queued caller can never wait forever.

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::oneshot;

use super::transport::{ApiRequest, HttpTransport};
use crate::config::resolve_url;
use crate::error::ApiError;
use crate::state::session::{AuthData, Role, SessionStore};

pub const REFRESH_PATH: &str = "/api/v1/refresh";

// =============================================================================
// REFRESH GRANT
// =============================================================================

/// A freshly issued access token plus whatever identity the server echoed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    pub access_token: String,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub user_id: Option<String>,
}

impl RefreshGrant {
    #[must_use]
    pub fn token(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), email: None, role: None, user_id: None }
    }
}

impl From<RefreshGrant> for AuthData {
    fn from(grant: RefreshGrant) -> Self {
        Self { access_token: Some(grant.access_token), email: grant.email, role: grant.role, user_id: grant.user_id }
    }
}

/// Parse a refresh response body.
///
/// Accepts a JSON string token, a JSON object with `access_token` (plus
/// optional `email`, `type`, `user_id`), or a bare token as plain text. A
/// plain-text body only counts as a token if it is at least
/// `MIN_BARE_TOKEN_LEN` characters of JWT/base64url alphabet, so a proxy's
/// `OK` fails the refresh instead of becoming the access token.
pub(crate) fn parse_refresh_body(body: &str) -> Result<RefreshGrant, ApiError> {
    let trimmed = body.trim();
    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(_) if is_bare_token(trimmed) => Value::String(trimmed.to_owned()),
        Err(e) => return Err(ApiError::Decode(e.to_string())),
    };

    let grant = match value {
        Value::String(token) => RefreshGrant::token(token),
        Value::Object(_) => {
            let data: AuthData = serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
            let access_token = data.access_token.ok_or(ApiError::MissingToken)?;
            RefreshGrant { access_token, email: data.email, role: data.role, user_id: data.user_id }
        }
        _ => return Err(ApiError::MissingToken),
    };

    if grant.access_token.trim().is_empty() {
        return Err(ApiError::MissingToken);
    }
    Ok(grant)
}

const MIN_BARE_TOKEN_LEN: usize = 16;

fn is_bare_token(raw: &str) -> bool {
    raw.len() >= MIN_BARE_TOKEN_LEN
        && raw.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '+' | '/' | '='))
}

// =============================================================================
// REFRESHER
// =============================================================================

/// Obtains a new access token using the refresh cookie. Enables mocking in tests.
#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    /// # Errors
    ///
    /// Returns the transport error, `ApiError::Status` for non-2xx, or
    /// `ApiError::MissingToken` when the response carries no token.
    async fn refresh(&self) -> Result<RefreshGrant, ApiError>;
}

/// `GET {base}/api/v1/refresh` on the raw transport. The expired access
/// token is deliberately not attached; the cookie jar carries the refresh
/// cookie.
pub struct RefreshEndpoint {
    transport: Arc<dyn HttpTransport>,
    url: String,
}

impl RefreshEndpoint {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str) -> Self {
        Self { transport, url: resolve_url(base_url, REFRESH_PATH) }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl TokenRefresher for RefreshEndpoint {
    async fn refresh(&self) -> Result<RefreshGrant, ApiError> {
        let request = ApiRequest::get(&self.url);
        let response = self.transport.send(&request).await?.error_for_status()?;
        parse_refresh_body(&response.body)
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Called once per failed refresh, after the queue has been rejected.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

type Waiter = oneshot::Sender<Result<(), ApiError>>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    pending: VecDeque<Waiter>,
}

enum Ticket {
    Leader,
    Follower(oneshot::Receiver<Result<(), ApiError>>),
}

/// Serializes token refreshes so that any burst of 401s triggers one refresh.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    refresher: Arc<dyn TokenRefresher>,
    session: SessionStore,
    on_session_expired: SessionExpiredHook,
    refreshes: AtomicU64,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(refresher: Arc<dyn TokenRefresher>, session: SessionStore, on_session_expired: SessionExpiredHook) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            refresher,
            session,
            on_session_expired,
            refreshes: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a refresh call is currently in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Requests parked behind the in-flight refresh.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Refresh calls issued since construction.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Recover from a 401: refresh (or wait for the in-flight refresh), then
    /// run `replay` and return its outcome.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RefreshFailed` if the refresh fails,
    /// `ApiError::RefreshAborted` if it was abandoned, or whatever `replay`
    /// returns.
    pub async fn recover<T, F, Fut>(&self, replay: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match self.enter() {
            Ticket::Follower(waiter) => {
                tracing::debug!("refresh in flight; request queued");
                match waiter.await {
                    Ok(Ok(())) => replay().await,
                    Ok(Err(err)) => Err(err),
                    Err(_) => Err(ApiError::RefreshAborted),
                }
            }
            Ticket::Leader => {
                let lease = RefreshLease { coordinator: self, settled: false };
                self.refreshes.fetch_add(1, Ordering::SeqCst);
                tracing::debug!("starting token refresh");

                match self.refresher.refresh().await {
                    Ok(grant) => {
                        self.session.set_auth_data(grant.into());
                        let released = lease.settle(Ok(()));
                        tracing::info!(released, "token refreshed; replaying queued requests");
                        // Released requests dispatch before the leader's own replay.
                        tokio::task::yield_now().await;
                        replay().await
                    }
                    Err(cause) => {
                        let err = ApiError::RefreshFailed(Box::new(cause));
                        let rejected = lease.settle(Err(err.clone()));
                        tracing::warn!(error = %err, rejected, "token refresh failed; ending session");
                        (self.on_session_expired)();
                        Err(err)
                    }
                }
            }
        }
    }

    fn enter(&self) -> Ticket {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.pending.push_back(tx);
            Ticket::Follower(rx)
        } else {
            state.refreshing = true;
            Ticket::Leader
        }
    }

    /// Flip back to idle and drain the queue in one critical section, then
    /// deliver the outcome in FIFO order. Returns the number of waiters.
    fn finish(&self, outcome: &Result<(), ApiError>) -> usize {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };
        let count = waiters.len();
        for waiter in waiters {
            if waiter.send(outcome.clone()).is_err() {
                tracing::debug!("queued request dropped before refresh settled");
            }
        }
        count
    }

    /// Drop all coordination state. Test-only.
    #[cfg(test)]
    pub(crate) fn reset(&self) {
        let mut state = self.lock();
        state.refreshing = false;
        state.pending.clear();
        self.refreshes.store(0, Ordering::SeqCst);
    }
}

/// Held by the leader while its refresh is in flight.
struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    fn settle(mut self, outcome: Result<(), ApiError>) -> usize {
        self.settled = true;
        self.coordinator.finish(&outcome)
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("token refresh cancelled; releasing queued requests");
            self.coordinator.finish(&Err(ApiError::RefreshAborted));
        }
    }
}
