//! Bookmarked jobs for the signed-in user.

#[cfg(test)]
#[path = "bookmarks_test.rs"]
mod tests;

use serde::Deserialize;
use serde_json::Value;

use super::jobs::string_or_number;
use crate::error::ApiError;
use crate::net::client::ApiClient;
use crate::net::transport::ApiRequest;

pub const BOOKMARKS_PATH: &str = "/api/v1/bookmarks";

#[derive(Debug, Deserialize)]
struct BookmarkEntry {
    #[serde(rename = "jobId", deserialize_with = "string_or_number")]
    job_id: String,
}

/// Ids of every bookmarked job. A non-array body yields an empty list.
///
/// # Errors
///
/// Returns any `ApiClient::send` error, or `ApiError::Decode` when an entry
/// has no `jobId`.
pub async fn fetch_bookmark_ids(api: &ApiClient) -> Result<Vec<String>, ApiError> {
    let body: Value = api.get_json(BOOKMARKS_PATH).await?;
    let Value::Array(items) = body else {
        return Ok(Vec::new());
    };
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<BookmarkEntry>(item)
                .map(|entry| entry.job_id)
                .map_err(|e| ApiError::Decode(e.to_string()))
        })
        .collect()
}

/// `POST /api/v1/bookmarks` with `{jobId}` and a CSRF token.
///
/// # Errors
///
/// Returns `ApiError::InvalidRequest` for a non-numeric id, otherwise any
/// `ApiClient::send` error.
pub async fn add_bookmark(api: &ApiClient, job_id: &str) -> Result<(), ApiError> {
    let id = parse_job_id(job_id)?;
    let request = ApiRequest::post(BOOKMARKS_PATH).json(serde_json::json!({ "jobId": id }));
    api.send_mutation(request).await?;
    tracing::debug!(job_id = id, "bookmark added");
    Ok(())
}

/// `DELETE /api/v1/bookmarks?job_id=<id>` with a CSRF token.
///
/// # Errors
///
/// See [`add_bookmark`].
pub async fn remove_bookmark(api: &ApiClient, job_id: &str) -> Result<(), ApiError> {
    let id = parse_job_id(job_id)?;
    api.send_mutation(ApiRequest::delete(format!("{BOOKMARKS_PATH}?job_id={id}"))).await?;
    tracing::debug!(job_id = id, "bookmark removed");
    Ok(())
}

fn parse_job_id(raw: &str) -> Result<u64, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::InvalidRequest(format!("job id must be numeric: {raw:?}")))
}
