//! Process-wide wiring of the session core.
//!
//! Builds each component exactly once: transport, session store, refresh
//! endpoint, route guard, refresh coordinator, and API client. The
//! coordinator's session-expired callback is the guard's
//! `logout_and_redirect`, injected here so neither module imports the other.

#[cfg(test)]
#[path = "app_test.rs"]
mod tests;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::guard::{Navigator, RouteGuard, RouteWhitelist};
use crate::net::client::ApiClient;
use crate::net::refresh::{RefreshCoordinator, RefreshEndpoint, SessionExpiredHook};
use crate::net::transport::{HttpTransport, ReqwestTransport};
use crate::state::session::SessionStore;

pub struct JobBoardClient {
    config: ClientConfig,
    session: SessionStore,
    guard: Arc<RouteGuard>,
    api: Arc<ApiClient>,
}

impl JobBoardClient {
    /// Wire the core over a `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, ApiError> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::from_parts(config, transport, navigator))
    }

    /// Wire the core over any transport.
    #[must_use]
    pub fn from_parts(config: ClientConfig, transport: Arc<dyn HttpTransport>, navigator: Arc<dyn Navigator>) -> Self {
        Self::with_whitelist(config, transport, navigator, RouteWhitelist::default())
    }

    #[must_use]
    pub fn with_whitelist(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        navigator: Arc<dyn Navigator>,
        whitelist: RouteWhitelist,
    ) -> Self {
        let session = SessionStore::new();
        let refresher = Arc::new(RefreshEndpoint::new(Arc::clone(&transport), &config.base_url));
        let guard = Arc::new(RouteGuard::new(session.clone(), whitelist, navigator, refresher.clone()));

        let expired_guard = Arc::clone(&guard);
        let on_session_expired: SessionExpiredHook = Arc::new(move || expired_guard.logout_and_redirect());
        let coordinator = Arc::new(RefreshCoordinator::new(refresher, session.clone(), on_session_expired));
        let api = Arc::new(ApiClient::new(&config, transport, session.clone(), coordinator));

        tracing::debug!(base_url = %config.base_url, "job board client ready");
        Self { config, session, guard, api }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    #[must_use]
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        self.api.coordinator()
    }

    /// Attempt one silent refresh at startup. See
    /// [`RouteGuard::restore_session_on_load`].
    pub async fn restore_session_on_load(&self) -> bool {
        self.guard.restore_session_on_load().await
    }
}
