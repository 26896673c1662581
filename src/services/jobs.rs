//! Job listings.

#[cfg(test)]
#[path = "jobs_test.rs"]
mod tests;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::resolve_url;
use crate::error::ApiError;
use crate::net::client::ApiClient;
use crate::net::transport::ApiRequest;

pub const JOBS_PATH: &str = "/api/v1/jobs";

// =============================================================================
// TYPES
// =============================================================================

/// A job posting as returned by `/api/v1/jobs`. Missing fields default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Job {
    #[serde(deserialize_with = "string_or_number")]
    pub job_id: String,
    pub company: String,
    pub role: String,
    pub location: String,
    /// ISO-8601 timestamp, kept as sent.
    pub post_time: Option<String>,
    pub description: String,
    pub highlights: Vec<String>,
    pub job_type: String,
    pub job_level: String,
    pub skills: Vec<String>,
    pub salary: Option<String>,
    pub status: String,
    pub total_applicants: u64,
    pub pending_applicants: u64,
}

/// Ids arrive as numbers from some endpoints and strings from others.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Build `{base}/api/v1/jobs?k=v...`, skipping empty filter values.
pub(crate) fn jobs_url(base_url: &str, params: &[(&str, &str)]) -> Result<String, ApiError> {
    let base = resolve_url(base_url, JOBS_PATH);
    let mut url = reqwest::Url::parse(&base).map_err(|e| ApiError::InvalidRequest(format!("{base}: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
            query.append_pair(key, value);
        }
    }
    let mut url = url.to_string();
    if url.ends_with('?') {
        url.pop();
    }
    Ok(url)
}

/// List jobs matching `filters` (`role`, `skills`, `company`, `jobLevel`,
/// `location`, `jobType`). A non-array body yields an empty list.
///
/// # Errors
///
/// Returns any `ApiClient::send` error, or `ApiError::Decode` for malformed
/// job entries.
pub async fn list_jobs(api: &ApiClient, filters: &[(&str, &str)]) -> Result<Vec<Job>, ApiError> {
    let url = jobs_url(api.base_url(), filters)?;
    let body: Value = api.send_json(ApiRequest::get(url)).await?;
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(|e| ApiError::Decode(e.to_string())))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

/// Fetch one job by id. The endpoint answers with either a single object or
/// a list whose first element is the job.
///
/// # Errors
///
/// See [`list_jobs`].
pub async fn fetch_job(api: &ApiClient, job_id: &str) -> Result<Option<Job>, ApiError> {
    let url = jobs_url(api.base_url(), &[("job_id", job_id)])?;
    let body: Value = api.send_json(ApiRequest::get(url)).await?;
    let job = match body {
        Value::Array(items) => items.into_iter().next(),
        Value::Object(_) => Some(body),
        _ => None,
    };
    job.map(|value| serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string())))
        .transpose()
}
