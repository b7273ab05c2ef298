//! HttpClient against an in-process axum server

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use plumbline_client::{HealthProbe, HealthStatus, HttpClient, PlaceholderClient};
use plumbline_common::{ApiErrorKind, HttpMethod, Post};
use serde_json::{json, Value};

async fn spawn_server() -> String {
    let app = Router::new()
        .route(
            "/posts",
            get(|| async { Json(json!([{"id": 1}, {"id": 2}])) }).post(
                |Json(body): Json<Value>| async move {
                    let mut created = body;
                    created["id"] = json!(101);
                    (StatusCode::CREATED, Json(created))
                },
            ),
        )
        .route(
            "/posts/1",
            get(|| async { Json(json!({"id": 1, "title": "t", "body": "b", "userId": 1})) }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({}))) }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Json(json!({}))
            }),
        )
        .route(
            "/whoami",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Json(json!({ "authorization": auth }))
            }),
        )
        .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
        .route("/text", get(|| async { "plain words" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_get_decodes_json() {
    let client = HttpClient::new(spawn_server().await, 5000);
    let resp = client.send(HttpMethod::Get, "/posts/1", None).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.status_text, "OK");
    assert!(resp.is_json());
    let post: Post = resp.json().unwrap();
    assert_eq!(post.id, 1);
}

#[tokio::test]
async fn test_post_echoes_payload() {
    let client = PlaceholderClient::new(Arc::new(HttpClient::new(spawn_server().await, 5000)));
    let payload = json!({"title": "foo", "body": "bar", "userId": 1});
    let resp = client.create_post(&payload).await.unwrap();
    assert_eq!(resp.status, 201);
    assert_eq!(resp.data["title"], "foo");
    assert_eq!(resp.data["userId"], 1);
}

#[tokio::test]
async fn test_non_2xx_is_status_error() {
    let client = HttpClient::new(spawn_server().await, 5000);
    let err = client.send(HttpMethod::Get, "/missing", None).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::HttpStatus);
    assert_eq!(err.status, Some(404));
    assert_eq!(err.status_text.as_deref(), Some("Not Found"));
    assert_eq!(err.message, "Request failed with status code 404");
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let client = HttpClient::new(spawn_server().await, 5000);
    client.set_timeout(100);
    let err = client.send(HttpMethod::Get, "/slow", None).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Timeout);
    assert_eq!(err.message, "timeout of 100ms exceeded");
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let client = HttpClient::new("http://127.0.0.1:1", 2000);
    let err = client.send(HttpMethod::Get, "/posts", None).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Transport);
    assert!(err.status.is_none());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let client = HttpClient::new(spawn_server().await, 5000);
    let resp = client.send(HttpMethod::Get, "/whoami", None).await.unwrap();
    assert_eq!(resp.data["authorization"], Value::Null);

    client.set_auth_token("t0k3n");
    let resp = client.send(HttpMethod::Get, "/whoami", None).await.unwrap();
    assert_eq!(resp.data["authorization"], "Bearer t0k3n");
}

#[tokio::test]
async fn test_empty_and_text_bodies() {
    let client = HttpClient::new(spawn_server().await, 5000);
    let resp = client.send(HttpMethod::Get, "/empty", None).await.unwrap();
    assert_eq!(resp.status, 204);
    assert_eq!(resp.data, Value::Null);

    let resp = client.send(HttpMethod::Get, "/text", None).await.unwrap();
    assert_eq!(resp.data, json!("plain words"));
}

#[tokio::test]
async fn test_probe_against_sparse_server_is_degraded() {
    let transport = Arc::new(HttpClient::new(spawn_server().await, 2000));
    let report = HealthProbe::new(transport, 1).run().await;
    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.summary.total, 8);
    assert_eq!(report.exit_code(), 1);
}
