//! Shared utilities for integration tests.

use axum::http::Method;
use express_router::{compat, Dispatcher, Request, Response};
use serde_json::Value;

/// Dispatcher over the compat reference application.
pub fn compat_dispatcher() -> Dispatcher {
    Dispatcher::new(compat::build_app().expect("compat app patterns compile"))
}

/// Serve one request with optional headers.
pub async fn send(dispatcher: &Dispatcher, method: Method, url: &str, headers: &[(&'static str, &str)]) -> Response {
    let mut map = axum::http::HeaderMap::new();
    for (name, value) in headers {
        map.insert(*name, value.parse().expect("valid header value"));
    }
    dispatcher.serve(Request::new(method, url).with_headers(map)).await
}

/// `GET url` and parse the JSON answer.
pub async fn get_json(dispatcher: &Dispatcher, url: &str) -> (u16, Value) {
    let response = send(dispatcher, Method::GET, url, &[]).await;
    let body = response.json_body().expect("JSON body");
    (response.status().as_u16(), body)
}

/// Labels of a `trace` array in a JSON answer.
#[allow(dead_code)]
pub fn trace_labels(body: &Value) -> Vec<String> {
    body["trace"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e["label"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
