//! Request entry point: runs the root router and turns what it leaves
//! unanswered into a 404 or an error response.
//!
//! # Responsibilities
//! - Decode the request once at entry; a malformed escape becomes an error
//!   travelling through the error-handling layers like any handler error
//! - Map "nothing responded" to the not-found responder
//! - Map an unhandled error to the terminal error responder
//! - Strip bodies from HEAD responses
//! - Record request metrics
//!
//! # Design Decisions
//! - The terminal error responder is a plain function returning `Response`,
//!   so a request can never be left unanswered
//! - Both responders see the request through the root view

use std::sync::Arc;
use std::time::Instant;

use axum::http::{Method, StatusCode};
use futures_util::future::BoxFuture;
use serde_json::json;

use crate::error::Error;
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::routing::handler::{Flow, Handler};
use crate::routing::params::Params;
use crate::routing::router::{Outcome, Router};
use crate::routing::view::View;

type ErrorResponder = dyn Fn(&Error, &Request) -> Response + Send + Sync;

/// Serves requests against an immutable router tree.
#[derive(Clone)]
pub struct Dispatcher {
    root: Arc<Router>,
    not_found: Option<Handler>,
    error_responder: Arc<ErrorResponder>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("root", &self.root)
            .field("not_found", &self.not_found)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(root: Router) -> Self {
        Self {
            root: Arc::new(root),
            not_found: None,
            error_responder: Arc::new(default_error_response),
        }
    }

    /// Replace the 404 responder. If `f` does not respond, the default 404
    /// is still sent.
    pub fn with_not_found<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        self.not_found = Some(Handler::normal(f));
        self
    }

    /// Replace the responder for errors no error handler answered.
    pub fn with_error_responder<F>(mut self, f: F) -> Self
    where
        F: Fn(&Error, &Request) -> Response + Send + Sync + 'static,
    {
        self.error_responder = Arc::new(f);
        self
    }

    /// Serve one request to completion.
    pub async fn serve(&self, mut req: Request) -> Response {
        let started = Instant::now();
        let method = req.method().clone();
        let root = View::root(req.original_url());

        let pending = req.decode().err();
        if let Some(err) = &pending {
            tracing::debug!(url = %req.original_url(), error = %err, "Request decode failed");
        }

        let outcome = self.root.handle(&mut req, &root, &Params::new(), pending).await;
        let (mut response, kind) = match outcome {
            Outcome::Responded(response) => (response, "handled"),
            Outcome::Next(None) => (self.not_found(&mut req, &root).await, "not_found"),
            Outcome::Next(Some(err)) => {
                req.enter(&root, Params::new());
                (self.unhandled(&err, &req), "error")
            }
        };

        if method == Method::HEAD {
            response.strip_body();
        }

        tracing::debug!(
            method = %method,
            url = %req.original_url(),
            status = response.status().as_u16(),
            outcome = kind,
            duration_ms = started.elapsed().as_millis() as u64,
            "Request dispatched"
        );
        metrics::record_request(method.as_str(), response.status().as_u16(), kind, started);

        response
    }

    async fn not_found(&self, req: &mut Request, root: &View) -> Response {
        req.enter(root, Params::new());
        if let Some(handler) = &self.not_found {
            match handler.invoke(req, None).await {
                Ok(Flow::Respond(response)) => return response,
                Ok(Flow::Error(err)) => return self.unhandled(&err, req),
                _ => {}
            }
            req.enter(root, Params::new());
        }
        default_not_found(req)
    }

    fn unhandled(&self, err: &Error, req: &Request) -> Response {
        if err.expose() {
            tracing::debug!(url = %req.original_url(), error = %err, "Client error reached terminal responder");
        } else {
            tracing::error!(url = %req.original_url(), error = ?err, "Unhandled error");
        }
        (self.error_responder)(err, req)
    }
}

fn default_not_found(req: &Request) -> Response {
    let body = json!({
        "error": format!("Cannot {} {}", req.method(), req.path()),
        "status": 404,
    });
    json_response(StatusCode::NOT_FOUND, &body)
}

/// Client errors carry their message; server errors are opaque.
pub fn default_error_response(err: &Error, _req: &Request) -> Response {
    let (status, message) = if err.expose() {
        (err.status(), err.to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::INTERNAL_SERVER_ERROR
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
        )
    };
    let body = json!({
        "error": message,
        "status": status.as_u16(),
    });
    json_response(status, &body)
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response {
    match Response::json(body) {
        Ok(response) => response.with_status(status),
        Err(_) => Response::status_text(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn app() -> Router {
        let mut router = Router::new();
        router
            .get("/hello", |_req| {
                Box::pin(async { Flow::Respond(Response::text("hello")) })
            })
            .unwrap();
        router
            .get("/conflict", |_req| {
                Box::pin(async { Flow::Error(Error::http(StatusCode::CONFLICT, "already exists")) })
            })
            .unwrap();
        router
            .get("/broken", |_req| {
                Box::pin(async { Flow::Error(Error::handler("database password is hunter2")) })
            })
            .unwrap();
        router
    }

    #[tokio::test]
    async fn test_default_not_found() {
        let dispatcher = Dispatcher::new(app());
        let res = dispatcher.serve(Request::new(Method::GET, "/nope?x=1")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            res.json_body().unwrap(),
            json!({"error": "Cannot GET /nope", "status": 404})
        );
    }

    #[tokio::test]
    async fn test_client_error_is_exposed() {
        let dispatcher = Dispatcher::new(app());
        let res = dispatcher.serve(Request::new(Method::GET, "/conflict")).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(res.json_body().unwrap()["error"], "already exists");
    }

    #[tokio::test]
    async fn test_server_error_is_opaque() {
        let dispatcher = Dispatcher::new(app());
        let res = dispatcher.serve(Request::new(Method::GET, "/broken")).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = res.json_body().unwrap();
        assert_eq!(body, json!({"error": "Internal Server Error", "status": 500}));
    }

    #[tokio::test]
    async fn test_malformed_escape_is_bad_request() {
        let dispatcher = Dispatcher::new(app());
        let res = dispatcher.serve(Request::new(Method::GET, "/hello?q=%ZZ")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_head_strips_body() {
        let dispatcher = Dispatcher::new(app());
        let res = dispatcher.serve(Request::new(Method::HEAD, "/hello")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().is_empty());
        assert_eq!(res.headers()["content-length"], "5");
    }

    #[tokio::test]
    async fn test_custom_responders() {
        let dispatcher = Dispatcher::new(app())
            .with_not_found(|req| {
                Box::pin(async move {
                    Flow::Respond(Response::text(format!("missing {}", req.path())).with_status(StatusCode::NOT_FOUND))
                })
            })
            .with_error_responder(|err, _req| Response::text("custom").with_status(err.status()));

        let res = dispatcher.serve(Request::new(Method::GET, "/nope")).await;
        assert_eq!(res.body().as_ref(), b"missing /nope");

        let res = dispatcher.serve(Request::new(Method::GET, "/conflict")).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(res.body().as_ref(), b"custom");
    }

    #[tokio::test]
    async fn test_not_found_handler_that_continues_falls_back() {
        let dispatcher = Dispatcher::new(app()).with_not_found(|_req| Box::pin(async { Flow::Continue }));
        let res = dispatcher.serve(Request::new(Method::POST, "/hello")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.json_body().unwrap()["error"], "Cannot POST /hello");
    }
}
