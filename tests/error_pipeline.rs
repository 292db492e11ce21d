//! Error propagation across routes, middleware and mounted routers.

use axum::http::{Method, StatusCode};
use express_router::{Dispatcher, Error, Flow, Request, Response, Router};

fn fail(status: StatusCode, message: &'static str) -> impl for<'a> Fn(&'a mut Request) -> futures_util::future::BoxFuture<'a, Flow> + Send + Sync + 'static {
    move |_req| Box::pin(async move { Flow::Error(Error::http(status, message)) })
}

fn text(body: &'static str) -> impl for<'a> Fn(&'a mut Request) -> futures_util::future::BoxFuture<'a, Flow> + Send + Sync + 'static {
    move |_req| Box::pin(async move { Flow::Respond(Response::text(body)) })
}

async fn get(dispatcher: &Dispatcher, url: &str) -> Response {
    dispatcher.serve(Request::new(Method::GET, url)).await
}

#[tokio::test]
async fn test_child_error_reaches_parent_error_handler() {
    let mut child = Router::new();
    child.get("/boom", fail(StatusCode::UNPROCESSABLE_ENTITY, "bad input")).unwrap();
    child.get("/boom", text("never")).unwrap();

    let mut root = Router::new();
    root.mount("/child", child).unwrap();
    root.get("/child/boom", text("never either")).unwrap();
    root.use_error(|err, req| {
        Box::pin(async move {
            let body = format!("{} at {} (base '{}')", err, req.original_url(), req.base_url());
            Flow::Respond(Response::text(body).with_status(err.status()))
        })
    });

    let response = get(&Dispatcher::new(root), "/child/boom").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body().as_ref(), b"bad input at /child/boom (base '')");
}

#[tokio::test]
async fn test_nearest_error_handler_wins() {
    let mut child = Router::new();
    child.get("/boom", fail(StatusCode::CONFLICT, "inner")).unwrap();
    child.use_error(|_err, _req| Box::pin(async { Flow::Respond(Response::text("child handled")) }));

    let mut root = Router::new();
    root.mount("/child", child).unwrap();
    root.use_error(|_err, _req| Box::pin(async { Flow::Respond(Response::text("root handled")) }));

    let response = get(&Dispatcher::new(root), "/child/boom").await;
    assert_eq!(response.body().as_ref(), b"child handled");
}

#[tokio::test]
async fn test_error_handler_can_pass_a_transformed_error() {
    let mut root = Router::new();
    root.get("/boom", fail(StatusCode::NOT_FOUND, "missing row")).unwrap();
    root.use_error(|err, _req| {
        Box::pin(async move {
            Flow::Error(Error::http(StatusCode::GONE, format!("wrapped: {err}")))
        })
    });

    let response = get(&Dispatcher::new(root), "/boom").await;
    assert_eq!(response.status(), StatusCode::GONE);
    assert_eq!(response.json_body().unwrap()["error"], "wrapped: missing row");
}

#[tokio::test]
async fn test_scoped_error_handler_only_sees_its_prefix() {
    let mut root = Router::new();
    root.get("/a/boom", fail(StatusCode::BAD_REQUEST, "a")).unwrap();
    root.get("/b/boom", fail(StatusCode::BAD_REQUEST, "b")).unwrap();
    root.use_error_at("/a", |_err, _req| Box::pin(async { Flow::Respond(Response::text("scoped")) }))
        .unwrap();

    let dispatcher = Dispatcher::new(root);
    assert_eq!(get(&dispatcher, "/a/boom").await.body().as_ref(), b"scoped");

    let response = get(&dispatcher, "/b/boom").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json_body().unwrap()["error"], "b");
}

#[tokio::test]
async fn test_route_level_error_handler() {
    let mut root = Router::new();
    root.route("/r")
        .unwrap()
        .get(fail(StatusCode::BAD_REQUEST, "route"))
        .error(|err, _req| Box::pin(async move { Flow::Respond(Response::text(format!("route saw {err}"))) }));

    let response = get(&Dispatcher::new(root), "/r").await;
    assert_eq!(response.body().as_ref(), b"route saw route");
}

#[tokio::test]
async fn test_panicking_handler_becomes_opaque_500() {
    let mut root = Router::new();
    root.get("/panic", |_req| {
        Box::pin(async {
            if true {
                panic!("secret detail");
            }
            Flow::Continue
        })
    })
    .unwrap();

    let response = get(&Dispatcher::new(root), "/panic").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json_body().unwrap(),
        serde_json::json!({"error": "Internal Server Error", "status": 500})
    );
}

#[tokio::test]
async fn test_panic_while_building_handler_future_is_answered() {
    let mut root = Router::new();
    root.get("/users/:id", |req| {
        let tenant = req.param("tenant").expect("tenant is always mounted").to_string();
        Box::pin(async move { Flow::Respond(Response::text(tenant)) })
    })
    .unwrap();
    root.use_error(|err, _req| {
        Box::pin(async move { Flow::Respond(Response::text(format!("caught {}", err.status().as_u16()))) })
    });

    let response = get(&Dispatcher::new(root), "/users/1").await;
    assert_eq!(response.body().as_ref(), b"caught 500");
}

#[tokio::test]
async fn test_skip_router_at_root_is_not_found() {
    let mut root = Router::new();
    root.use_fn(|_req| Box::pin(async { Flow::SkipRouter }));
    root.get("/x", text("never")).unwrap();

    let response = get(&Dispatcher::new(root), "/x").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
