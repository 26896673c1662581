//! CSRF token fetch for state-changing requests.
//!
//! ERROR HANDLING
//! ==============
//! A missing CSRF token degrades instead of failing: every failure path logs
//! and yields an empty string. Callers decide whether to send the mutating
//! request without the header or to abort. Tokens are fetched fresh for each
//! mutating call and never cached.

#[cfg(test)]
#[path = "csrf_test.rs"]
mod tests;

use serde_json::Value;

use super::transport::{ApiRequest, HttpTransport};
use crate::config::resolve_url;

pub const CSRF_PATH: &str = "/api/v1/csrf-token";
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Accepted response fields, in precedence order.
const TOKEN_FIELDS: [&str; 3] = ["csrf_token", "token", "csrf"];

/// Fetch a one-time CSRF token from `GET {base_url}/api/v1/csrf-token`.
///
/// Returns an empty string on network errors, non-2xx statuses, or a body
/// without a usable token. Never retries.
pub async fn fetch_csrf_token(transport: &dyn HttpTransport, base_url: &str) -> String {
    let request = ApiRequest::get(resolve_url(base_url, CSRF_PATH));
    let response = match transport.send(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "csrf token fetch failed");
            return String::new();
        }
    };
    if !response.is_success() {
        tracing::warn!(status = response.status, "csrf token fetch rejected");
        return String::new();
    }
    match extract_csrf_token(&response.body) {
        Some(token) => token,
        None => {
            tracing::warn!("csrf token response carried no token field");
            String::new()
        }
    }
}

/// First non-empty string among the accepted token fields.
pub(crate) fn extract_csrf_token(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    TOKEN_FIELDS.iter().find_map(|field| {
        value
            .get(field)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
    })
}
