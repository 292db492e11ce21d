//! Express compatibility reference application.
//!
//! Every route answers with a JSON snapshot of what the handler saw
//! (`url`, `baseUrl`, `path`, `params`, ...) so a client can compare routing
//! behaviour against a stock Express server route by route. Its trailing
//! error handler answers 400 for every error, including server-side ones,
//! as the Express app it mirrors does; the dispatcher's own terminal
//! responder is never reached through this app.

use axum::http::header::HeaderValue;
use axum::http::{HeaderName, StatusCode};
use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::error::Error;
use crate::http::{Request, Response};
use crate::routing::{Flow, PatternError, Router, RouterOptions};

/// Snapshots accumulated by tracing middleware, kept in request extensions.
#[derive(Debug, Clone, Default)]
pub struct Trace(pub Vec<Value>);

/// What the current handler sees of the request.
pub fn snapshot(req: &Request, label: &str) -> Value {
    json!({
        "label": label,
        "method": req.method().as_str(),
        "url": req.url(),
        "originalUrl": req.original_url(),
        "baseUrl": req.base_url(),
        "path": req.path(),
        "params": req.params(),
        "query": req.query(),
        "headers": {
            "x-test": req.header("x-test").unwrap_or(""),
        },
    })
}

fn trace_push(req: &mut Request, label: &str) {
    let entry = snapshot(req, label);
    let mut trace = req.extensions_mut().remove::<Trace>().unwrap_or_default();
    trace.0.push(entry);
    req.extensions_mut().insert(trace);
}

fn trace_of(req: &Request) -> Vec<Value> {
    req.extensions()
        .get::<Trace>()
        .map(|t| t.0.clone())
        .unwrap_or_default()
}

fn send_json(status: StatusCode, value: &Value) -> Flow {
    Flow::from(Response::json(value).map(|r| r.with_status(status)))
}

/// Route handler answering with a snapshot labelled `label`.
fn reply(label: &'static str) -> impl for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static {
    move |req| Box::pin(async move { send_json(StatusCode::OK, &snapshot(req, label)) })
}

/// Middleware recording a snapshot labelled `label`.
fn tracer(label: &'static str) -> impl for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static {
    move |req| {
        Box::pin(async move {
            trace_push(req, label);
            Flow::Continue
        })
    }
}

/// The reference application with default root options.
pub fn build_app() -> Result<Router, PatternError> {
    build_app_with(RouterOptions::default())
}

/// The reference application with custom root options.
pub fn build_app_with(options: RouterOptions) -> Result<Router, PatternError> {
    let mut app = Router::with_options(options);

    app.get("/__meta", |_req| {
        Box::pin(async {
            send_json(
                StatusCode::OK,
                &json!({"ok": true, "server": env!("CARGO_PKG_NAME"), "express": true}),
            )
        })
    })?;
    app.get("/health", |_req| {
        Box::pin(async { send_json(StatusCode::OK, &json!({"ok": true, "label": "health"})) })
    })?;

    app.get("/Case/Path", reply("case"))?;
    app.get("/trail/", reply("trail"))?;
    app.get("/file/*", reply("file"))?;
    app.get("/a/*/b/*", reply("multi_wild"))?;
    app.get("/p/:x", reply("param"))?;
    app.get("/query/echo", reply("query_echo"))?;

    app.get("/head-demo", |_req| {
        Box::pin(async {
            Flow::Respond(
                Response::text("head body")
                    .with_header(HeaderName::from_static("x-demo"), HeaderValue::from_static("1")),
            )
        })
    })?;

    app.get(r"/nr/:id(\d+)", |req| {
        Box::pin(async move {
            if req.param("id") == Some("0") {
                Flow::SkipRoute
            } else {
                Flow::Continue
            }
        })
    })?
    .get(reply("nr_primary"));
    app.get(r"/nr/:id(\d+)", reply("nr_fallback"))?;

    app.mount("/guarded", guarded_router()?)?;
    app.get("/guarded/*", |_req| {
        Box::pin(async {
            send_json(
                StatusCode::FORBIDDEN,
                &json!({"label": "guarded_fallback", "status": 403}),
            )
        })
    })?;

    let mut root = Router::new();
    root.get("/root/test", reply("root_mount"))?;
    app.mount("/", root)?;

    app.mount("/api", api_router()?)?;

    let mut mp_merge = Router::with_options(RouterOptions::merge_params());
    mp_merge.get("/users/:id", reply("mp_merge"))?;
    app.mount("/mp/merge/t/:tenant", mp_merge)?;

    let mut mp_no_merge = Router::new();
    mp_no_merge.get("/users/:id", reply("mp_nomerge"))?;
    app.mount("/mp/nomerge/t/:tenant", mp_no_merge)?;

    app.mount("/scope/nomerge/:a", scope_router(false)?)?;
    app.mount("/scope/merge/:a", scope_router(true)?)?;

    app.get("/decode/:p", reply("decode_ok"))?;

    app.use_fn(|req| {
        Box::pin(async move {
            send_json(
                StatusCode::NOT_FOUND,
                &json!({"label": "not_found", "path": req.path()}),
            )
        })
    });

    app.use_error(|err, _req| Box::pin(async move { error_reply(&err) }));

    Ok(app)
}

/// Every error the app's handler sees is answered as a client error, message included.
fn error_reply(err: &Error) -> Flow {
    send_json(
        StatusCode::BAD_REQUEST,
        &json!({"label": "error", "error": err.to_string()}),
    )
}

/// Only lets requests with `?allow=true` reach its routes.
fn guarded_router() -> Result<Router, PatternError> {
    let mut guarded = Router::new();
    guarded.use_fn(|req| {
        Box::pin(async move {
            if req.query_param("allow") == Some("true") {
                Flow::Continue
            } else {
                Flow::SkipRouter
            }
        })
    });
    guarded.get("/stats", reply("guarded_stats"))?;
    Ok(guarded)
}

fn api_router() -> Result<Router, PatternError> {
    let mut v1 = Router::new();
    v1.use_fn(tracer("v1.use"));
    v1.get("/users/:id", |req| {
        Box::pin(async move {
            trace_push(req, "handler");
            send_json(
                StatusCode::OK,
                &json!({"label": "nested_trace", "trace": trace_of(req)}),
            )
        })
    })?;

    let mut api = Router::new();
    api.use_fn(tracer("api.use"));
    api.mount("/v1", v1)?;
    Ok(api)
}

fn scope_router(merge: bool) -> Result<Router, PatternError> {
    let (parent_label, child_label, handler_label, label) = if merge {
        ("scopeMerge.parent", "scopeMerge.child", "scopeMerge.handler", "scope_merge")
    } else {
        ("scopeNoMerge.parent", "scopeNoMerge.child", "scopeNoMerge.handler", "scope_nomerge")
    };

    let mut child = Router::with_options(RouterOptions {
        merge_params: merge,
        ..RouterOptions::default()
    });
    child.use_fn(tracer(child_label));
    child.get("/end", move |req| {
        Box::pin(async move {
            trace_push(req, handler_label);
            send_json(StatusCode::OK, &json!({"label": label, "trace": trace_of(req)}))
        })
    })?;

    let mut parent = Router::with_options(RouterOptions::merge_params());
    parent.use_fn(tracer(parent_label));
    parent.mount("/b/:b", child)?;
    Ok(parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_builds() {
        let app = build_app().unwrap();
        assert!(!app.is_empty());
    }

    #[test]
    fn test_error_reply_is_always_400() {
        let Flow::Respond(response) = error_reply(&Error::handler("db down")) else {
            panic!("error handler must respond");
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json_body().unwrap(),
            json!({"label": "error", "error": "handler failed: db down"})
        );
    }

    #[test]
    fn test_trace_accumulates() {
        let mut req = Request::new(axum::http::Method::GET, "/x");
        trace_push(&mut req, "one");
        trace_push(&mut req, "two");
        let labels: Vec<_> = trace_of(&req).iter().map(|s| s["label"].clone()).collect();
        assert_eq!(labels, vec![json!("one"), json!("two")]);
    }
}
