use super::*;
use crate::net::csrf::CSRF_HEADER;
use crate::net::mock::{MockTransport, client_over};
use crate::net::transport::ApiResponse;

fn csrf_then(status: u16, body: &'static str) -> std::sync::Arc<MockTransport> {
    MockTransport::new(move |req| {
        if req.url.ends_with("/api/v1/csrf-token") {
            Ok(ApiResponse::new(200, r#"{"csrf_token":"c1"}"#))
        } else {
            Ok(ApiResponse::new(status, body))
        }
    })
}

#[tokio::test]
async fn fetch_ids_stringifies_job_ids() {
    let api = client_over(csrf_then(200, r#"[{"jobId":1},{"jobId":"22"}]"#));
    assert_eq!(fetch_bookmark_ids(&api).await.unwrap(), vec!["1".to_owned(), "22".to_owned()]);
}

#[tokio::test]
async fn fetch_ids_non_array_is_empty() {
    let api = client_over(csrf_then(200, "{}"));
    assert!(fetch_bookmark_ids(&api).await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_ids_entry_without_job_id_is_decode_error() {
    let api = client_over(csrf_then(200, r#"[{"id":1}]"#));
    assert!(matches!(fetch_bookmark_ids(&api).await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn add_bookmark_posts_numeric_id_with_csrf() {
    let transport = csrf_then(201, "{}");
    let api = client_over(transport.clone());
    api.session().update_token("T1");

    add_bookmark(&api, "17").await.unwrap();

    let posts = transport.sent_to(BOOKMARKS_PATH);
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].method, reqwest::Method::POST);
    assert_eq!(posts[0].body, Some(serde_json::json!({ "jobId": 17 })));
    assert_eq!(posts[0].header_value(CSRF_HEADER), Some("c1"));
    assert_eq!(posts[0].header_value("Authorization"), Some("Bearer T1"));
}

#[tokio::test]
async fn remove_bookmark_sends_query_param() {
    let transport = csrf_then(204, "");
    let api = client_over(transport.clone());

    remove_bookmark(&api, "17").await.unwrap();

    let deletes = transport.sent_to("/api/v1/bookmarks?job_id=17");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].method, reqwest::Method::DELETE);
    assert_eq!(deletes[0].header_value(CSRF_HEADER), Some("c1"));
}

#[tokio::test]
async fn non_numeric_id_is_rejected_before_sending() {
    let transport = csrf_then(200, "{}");
    let api = client_over(transport.clone());
    assert!(matches!(add_bookmark(&api, "abc").await, Err(ApiError::InvalidRequest(_))));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn failed_mutation_surfaces_status() {
    let api = client_over(csrf_then(409, "already bookmarked"));
    assert_eq!(
        add_bookmark(&api, "17").await,
        Err(ApiError::Status { status: 409, body: "already bookmarked".into() })
    );
}
