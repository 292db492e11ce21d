//! The compat application behind the Axum transport.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use express_router::config::AppConfig;
use express_router::{compat, Dispatcher, HttpServer};
use tower::ServiceExt;

fn server(config: AppConfig) -> HttpServer {
    let app = compat::build_app().unwrap();
    HttpServer::new(config, Dispatcher::new(app))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_nested_route_over_http() {
    let request = Request::builder()
        .uri("/api/v1/users/42?debug=1")
        .header("x-test", "over-http")
        .body(Body::empty())
        .unwrap();

    let response = server(AppConfig::default()).router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = body_json(response).await;
    let handler = &body["trace"][2];
    assert_eq!(handler["params"]["id"], "42");
    assert_eq!(handler["query"]["debug"], "1");
    assert_eq!(handler["headers"]["x-test"], "over-http");
}

#[tokio::test]
async fn test_head_over_http_has_no_body() {
    let request = Request::builder()
        .method("HEAD")
        .uri("/head-demo")
        .body(Body::empty())
        .unwrap();

    let response = server(AppConfig::default()).router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-demo"], "1");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_decode_error_over_http() {
    let request = Request::builder()
        .uri("/decode/%E0%A4%A")
        .body(Body::empty())
        .unwrap();

    let response = server(AppConfig::default()).router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["label"], "error");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = AppConfig::default();
    config.listener.max_body_bytes = 8;

    let request = Request::builder()
        .method("POST")
        .uri("/health")
        .header("content-length", "64")
        .body(Body::from(vec![b'x'; 64]))
        .unwrap();

    let response = server(config).router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
