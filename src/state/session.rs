//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Read by the request interceptor (bearer header), the refresh coordinator
//! (token replacement) and the route guard (role-based redirects).
//!
//! DESIGN
//! ======
//! A single `RwLock<Session>` backs every clone of `SessionStore`. Each action
//! takes the write lock once and performs its whole mutation inside it, so a
//! reader can never observe a half-applied login or a half-cleared logout.
//! No action holds the lock across an await point.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// ROLE
// =============================================================================

/// Closed set of account roles known to the job board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Company,
    Professor,
    Student,
    Staff,
    Visitor,
}

impl Role {
    /// Parse the wire `type` field. Unknown values yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "company" => Some(Self::Company),
            "professor" => Some(Self::Professor),
            "student" => Some(Self::Student),
            "staff" => Some(Self::Staff),
            "visitor" => Some(Self::Visitor),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Company => "company",
            Self::Professor => "professor",
            Self::Student => "student",
            Self::Staff => "staff",
            Self::Visitor => "visitor",
        }
    }

    /// Landing page after login or session restore.
    #[must_use]
    pub fn landing_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin/dashboard",
            Self::Company => "/company/dashboard",
            Self::Professor => "/professor/dashboard",
            Self::Student => "/student/dashboard",
            Self::Staff => "/staff/dashboard",
            Self::Visitor => "/",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn deserialize_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Role::parse))
}

/// User ids arrive as strings or numbers depending on the endpoint.
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("expected string or number user_id, got {other}"))),
    }
}

// =============================================================================
// AUTH DATA
// =============================================================================

/// Partial session update as returned by the login and refresh endpoints.
/// Absent fields leave the corresponding session field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "deserialize_role", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "deserialize_user_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl AuthData {
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self { access_token: Some(token.into()), ..Self::default() }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub user_id: Option<String>,
}

/// Point-in-time copy of the session fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub role: Option<Role>,
    pub user_id: Option<String>,
    pub is_registered: bool,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        if !self.is_authenticated() {
            return None;
        }
        Some(Identity { username: self.username.clone(), role: self.role, user_id: self.user_id.clone() })
    }

    /// Landing path for the current role; `/` when no role is known.
    #[must_use]
    pub fn redirect_path(&self) -> &'static str {
        match self.role {
            Some(role) => role.landing_path(),
            None => "/",
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Shared handle to the process-wide session. Clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Session>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Merge the provided fields into the session. Omitted fields are kept.
    pub fn set_auth_data(&self, data: AuthData) {
        let mut session = self.write();
        if let Some(token) = data.access_token {
            session.access_token = Some(token);
        }
        if let Some(email) = data.email {
            session.username = Some(email);
        }
        if let Some(role) = data.role {
            session.role = Some(role);
        }
        if let Some(user_id) = data.user_id {
            session.user_id = Some(user_id);
        }
    }

    /// Replace the access token only.
    pub fn update_token(&self, token: impl Into<String>) {
        self.write().access_token = Some(token.into());
    }

    pub fn set_is_registered(&self, value: bool) {
        self.write().is_registered = value;
    }

    /// Clear every session field in one step.
    pub fn logout(&self) {
        *self.write() = Session::default();
    }

    /// Alias for [`SessionStore::logout`].
    pub fn clear_auth_data(&self) {
        self.logout();
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.read().identity()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.read().role
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.read().is_registered
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    #[must_use]
    pub fn is_company(&self) -> bool {
        self.role() == Some(Role::Company)
    }

    #[must_use]
    pub fn is_professor(&self) -> bool {
        self.role() == Some(Role::Professor)
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.role() == Some(Role::Student)
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role() == Some(Role::Staff)
    }

    #[must_use]
    pub fn is_visitor(&self) -> bool {
        self.role() == Some(Role::Visitor)
    }

    #[must_use]
    pub fn redirect_path(&self) -> &'static str {
        self.read().redirect_path()
    }
}
