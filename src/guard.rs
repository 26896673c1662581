//! Route guard: public-route whitelist, logout-and-redirect, session restore.
//!
//! SYSTEM CONTEXT
//! ==============
//! The guard is the only component that navigates. The refresh coordinator
//! reaches it through the session-expired callback wired up in `app`, and the
//! app calls `restore_session_on_load` once at startup.
//!
//! DESIGN
//! ======
//! Navigation is abstracted behind `Navigator` so the guard can drive a real
//! router, the CLI, or a `MemoryNavigator` in tests. Startup restore and
//! mid-session refresh failure are intentionally asymmetric: a failed restore
//! clears the session without navigating, while a failed mid-session refresh
//! logs out and redirects.

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::net::refresh::TokenRefresher;
use crate::state::session::SessionStore;

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_LOGIN_PATH: &str = "/admin";
pub const HOME_PATH: &str = "/";

// =============================================================================
// WHITELIST
// =============================================================================

/// Routes reachable without an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteWhitelist {
    pub exact: Vec<String>,
    pub prefixes: Vec<String>,
}

impl Default for RouteWhitelist {
    fn default() -> Self {
        Self {
            exact: ["/admin", "/login", "/", "/registration"].map(String::from).to_vec(),
            prefixes: vec!["/tos".to_owned()],
        }
    }
}

impl RouteWhitelist {
    /// Exact match against `exact`, or prefix match against `prefixes`.
    #[must_use]
    pub fn is_whitelisted(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

// =============================================================================
// NAVIGATOR
// =============================================================================

/// Router abstraction. `replace` swaps the current entry rather than pushing.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn replace(&self, path: &str);
}

/// In-memory navigator that records every replacement.
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new(start: impl Into<String>) -> Self {
        Self { history: Mutex::new(vec![start.into()]) }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starting path followed by every path navigated to.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().clone()
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.lock().last().cloned().unwrap_or_else(|| HOME_PATH.to_owned())
    }

    fn replace(&self, path: &str) {
        self.lock().push(path.to_owned());
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Outcome of checking a navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Redirect(String),
}

pub struct RouteGuard {
    session: SessionStore,
    whitelist: RouteWhitelist,
    navigator: Arc<dyn Navigator>,
    refresher: Arc<dyn TokenRefresher>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(
        session: SessionStore,
        whitelist: RouteWhitelist,
        navigator: Arc<dyn Navigator>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self { session, whitelist, navigator, refresher }
    }

    #[must_use]
    pub fn whitelist(&self) -> &RouteWhitelist {
        &self.whitelist
    }

    #[must_use]
    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    #[must_use]
    pub fn is_route_whitelisted(&self, path: &str) -> bool {
        self.whitelist.is_whitelisted(path)
    }

    /// Clear the session, then leave public routes alone and send everyone
    /// else to the login page matching the role they had.
    pub fn logout_and_redirect(&self) {
        // Must be read before logout clears the role.
        let was_admin = self.session.is_admin();
        self.session.logout();

        let current = self.navigator.current_path();
        if self.is_route_whitelisted(&current) {
            tracing::info!(path = %current, "session cleared on public route; staying");
            return;
        }
        let target = if was_admin { ADMIN_LOGIN_PATH } else { LOGIN_PATH };
        tracing::info!(from = %current, to = target, "session cleared; redirecting");
        self.navigator.replace(target);
    }

    /// One silent refresh at startup. On success the session is populated
    /// and users sitting on `/` or `/login` go to their landing page. On
    /// failure the session is cleared and the user stays anonymous on the
    /// current route. Returns whether a session was restored.
    pub async fn restore_session_on_load(&self) -> bool {
        match self.refresher.refresh().await {
            Ok(grant) => {
                self.session.set_auth_data(grant.into());
                let current = self.navigator.current_path();
                if current == HOME_PATH || current == LOGIN_PATH {
                    let target = self.session.redirect_path();
                    tracing::info!(from = %current, to = target, "session restored; redirecting");
                    self.navigator.replace(target);
                } else {
                    tracing::info!(path = %current, "session restored");
                }
                true
            }
            Err(err) => {
                // No identity may outlive a missing token.
                self.session.logout();
                tracing::warn!(error = %err, "no session restored at startup");
                false
            }
        }
    }

    /// Per-navigation check: public routes and authenticated users pass,
    /// everyone else goes to the login page.
    #[must_use]
    pub fn check_navigation(&self, path: &str) -> NavigationDecision {
        if self.is_route_whitelisted(path) || self.session.is_authenticated() {
            NavigationDecision::Allow
        } else {
            NavigationDecision::Redirect(LOGIN_PATH.to_owned())
        }
    }
}
