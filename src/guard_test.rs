use super::*;
use crate::error::ApiError;
use crate::net::mock::MockRefresher;
use crate::net::refresh::RefreshGrant;
use crate::state::session::{AuthData, Role, Session};

fn guard_at(path: &str, refresher: Arc<MockRefresher>) -> (RouteGuard, SessionStore, Arc<MemoryNavigator>) {
    let session = SessionStore::new();
    let navigator = Arc::new(MemoryNavigator::new(path));
    let guard = RouteGuard::new(session.clone(), RouteWhitelist::default(), navigator.clone(), refresher);
    (guard, session, navigator)
}

fn grant(role: Role) -> RefreshGrant {
    RefreshGrant { role: Some(role), ..RefreshGrant::token("T1") }
}

// =============================================================================
// Whitelist
// =============================================================================

#[test]
fn whitelist_matches_exact_paths() {
    let whitelist = RouteWhitelist::default();
    assert!(whitelist.is_whitelisted("/login"));
    assert!(whitelist.is_whitelisted("/"));
    assert!(whitelist.is_whitelisted("/admin"));
    assert!(whitelist.is_whitelisted("/registration"));
}

#[test]
fn whitelist_matches_prefixes() {
    let whitelist = RouteWhitelist::default();
    assert!(whitelist.is_whitelisted("/tos/privacy"));
    assert!(whitelist.is_whitelisted("/tos"));
}

#[test]
fn whitelist_rejects_protected_paths() {
    let whitelist = RouteWhitelist::default();
    assert!(!whitelist.is_whitelisted("/student/dashboard"));
    assert!(!whitelist.is_whitelisted("/admin/dashboard"));
    assert!(!whitelist.is_whitelisted("/login/extra"));
    assert!(!whitelist.is_whitelisted(""));
}

// =============================================================================
// MemoryNavigator
// =============================================================================

#[test]
fn memory_navigator_records_history() {
    let nav = MemoryNavigator::new("/student/dashboard");
    assert_eq!(nav.current_path(), "/student/dashboard");
    nav.replace("/login");
    assert_eq!(nav.current_path(), "/login");
    assert_eq!(nav.history(), vec!["/student/dashboard".to_owned(), "/login".to_owned()]);
}

// =============================================================================
// logout_and_redirect
// =============================================================================

#[test]
fn logout_on_protected_route_redirects_to_login() {
    let (guard, session, nav) = guard_at("/student/dashboard", MockRefresher::succeeding("T2"));
    session.set_auth_data(AuthData { role: Some(Role::Student), ..AuthData::token("T1") });

    guard.logout_and_redirect();

    assert!(!session.is_authenticated());
    assert_eq!(session.role(), None);
    assert_eq!(nav.current_path(), "/login");
}

#[test]
fn logout_of_admin_redirects_to_admin_login() {
    let (guard, session, nav) = guard_at("/admin/dashboard", MockRefresher::succeeding("T2"));
    session.set_auth_data(AuthData { role: Some(Role::Admin), ..AuthData::token("T1") });

    guard.logout_and_redirect();

    assert!(!session.is_admin());
    assert_eq!(nav.current_path(), "/admin");
}

#[test]
fn logout_on_whitelisted_route_does_not_navigate() {
    let (guard, session, nav) = guard_at("/tos/privacy", MockRefresher::succeeding("T2"));
    session.update_token("T1");

    guard.logout_and_redirect();

    assert!(!session.is_authenticated());
    assert_eq!(nav.history(), vec!["/tos/privacy".to_owned()]);
}

// =============================================================================
// restore_session_on_load
// =============================================================================

#[tokio::test]
async fn restore_from_login_redirects_to_landing_page() {
    let (guard, session, nav) = guard_at("/login", MockRefresher::with_outcome(Ok(grant(Role::Student))));

    assert!(guard.restore_session_on_load().await);

    assert_eq!(session.token().as_deref(), Some("T1"));
    assert_eq!(nav.current_path(), "/student/dashboard");
}

#[tokio::test]
async fn restore_from_home_redirects_company() {
    let (guard, _, nav) = guard_at("/", MockRefresher::with_outcome(Ok(grant(Role::Company))));
    assert!(guard.restore_session_on_load().await);
    assert_eq!(nav.current_path(), "/company/dashboard");
}

#[tokio::test]
async fn restore_elsewhere_keeps_current_route() {
    let (guard, session, nav) = guard_at("/jobs/42", MockRefresher::with_outcome(Ok(grant(Role::Student))));

    assert!(guard.restore_session_on_load().await);

    assert!(session.is_student());
    assert_eq!(nav.history(), vec!["/jobs/42".to_owned()]);
}

#[tokio::test]
async fn restore_failure_stays_anonymous_without_redirect() {
    let refresher = MockRefresher::failing(ApiError::Status { status: 401, body: String::new() });
    let (guard, session, nav) = guard_at("/student/dashboard", refresher.clone());

    assert!(!guard.restore_session_on_load().await);

    assert!(!session.is_authenticated());
    assert_eq!(session.role(), None);
    assert_eq!(nav.history(), vec!["/student/dashboard".to_owned()]);
    assert_eq!(refresher.calls(), 1);
}

#[tokio::test]
async fn restore_failure_clears_stale_identity() {
    let refresher = MockRefresher::failing(ApiError::Status { status: 401, body: String::new() });
    let (guard, session, nav) = guard_at("/student/dashboard", refresher);
    session.set_auth_data(AuthData { role: Some(Role::Admin), ..AuthData::default() });

    assert!(!guard.restore_session_on_load().await);

    assert_eq!(session.snapshot(), Session::default());
    assert!(!session.is_admin());
    assert_eq!(nav.history(), vec!["/student/dashboard".to_owned()]);

    guard.logout_and_redirect();
    assert_eq!(nav.current_path(), "/login");
}

// =============================================================================
// check_navigation
// =============================================================================

#[test]
fn anonymous_users_are_sent_to_login_from_protected_routes() {
    let (guard, _, _) = guard_at("/", MockRefresher::succeeding("T2"));
    assert_eq!(guard.check_navigation("/student/dashboard"), NavigationDecision::Redirect("/login".into()));
    assert_eq!(guard.check_navigation("/tos/terms"), NavigationDecision::Allow);
}

#[test]
fn authenticated_users_pass_protected_routes() {
    let (guard, session, _) = guard_at("/", MockRefresher::succeeding("T2"));
    session.update_token("T1");
    assert_eq!(guard.check_navigation("/student/dashboard"), NavigationDecision::Allow);
}
