//! Shared fixtures for integration tests.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use sift::IndexRepository;
use std::sync::Arc;
use tower::ServiceExt;

/// A fresh in-memory repository with its router.
pub fn test_router() -> (Arc<IndexRepository>, Router) {
    let repo = Arc::new(IndexRepository::new());
    let router = sift::server::router(Arc::clone(&repo));
    (repo, router)
}

/// Send one request through the router and return the response.
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    router.clone().oneshot(request).await.unwrap()
}

/// Send a request and parse the JSON response body.
pub async fn send_json(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = send(router, method, uri, body).await;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Create an index named `id` with the simple analyzer and seed it with
/// the four-document corpus used by the search tests.
pub async fn seed_corpus(router: &Router, id: &str) {
    let (status, _) = send_json(
        router,
        "POST",
        "/indexes",
        Some(serde_json::json!({"id": id, "analyzer": "SimpleAnalyzer"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for (doc_id, text) in [
        ("1", "the first example example"),
        ("2", "another cool example"),
        ("3", "another example"),
        ("4", "last"),
    ] {
        let (status, _) = send_json(
            router,
            "POST",
            &format!("/indexes/{id}/docs"),
            Some(serde_json::json!({"id": doc_id, "text": text})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}
