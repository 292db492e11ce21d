//! Router: an ordered list of layers that composes into a tree by mounting.
//!
//! # Responsibilities
//! - Register routes, middleware, error handlers and child routers in order
//! - Scan layers for one request, entering the first ones whose pattern
//!   matches the remaining path
//! - Resolve handler signals into "responded" or "continue in the parent"
//!
//! # Design Decisions
//! - A router is a plain value; the tree is built before serving and never
//!   mutated afterwards, so lookups need no locking
//! - The mount view is passed down by reference; a child gets a new view and
//!   the parent's is untouched when the child returns
//! - While an error is pending only error-handling middleware runs; routes
//!   and child routers are skipped
//! - Middleware and mounts always use loose trailing-slash matching

use axum::http::header::{self, HeaderValue};
use axum::http::Method;
use futures_util::future::BoxFuture;
use serde::Deserialize;

use crate::error::Error;
use crate::http::{Request, Response};
use crate::routing::handler::{Flow, Handler};
use crate::routing::params::Params;
use crate::routing::pattern::{Pattern, PatternError, PatternMatch, PatternOptions};
use crate::routing::route::{Route, RouteOutcome};
use crate::routing::view::View;

/// Per-router matching and scoping policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Compare literal segments case-sensitively.
    pub case_sensitive: bool,
    /// Treat a trailing slash on routes as significant.
    pub strict: bool,
    /// Expose parameters captured by ancestors to this router's handlers.
    pub merge_params: bool,
}

impl RouterOptions {
    pub fn merge_params() -> Self {
        Self {
            merge_params: true,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
enum Layer {
    Route(Route),
    /// `scope` is `None` for middleware registered without a path.
    Middleware {
        scope: Option<Pattern>,
        handler: Handler,
    },
    Mount {
        pattern: Pattern,
        router: Router,
    },
}

impl Layer {
    fn kind(&self) -> &'static str {
        match self {
            Layer::Route(_) => "route",
            Layer::Middleware { handler, .. } if handler.is_error_handler() => "error",
            Layer::Middleware { .. } => "use",
            Layer::Mount { .. } => "router",
        }
    }

    fn source(&self) -> &str {
        match self {
            Layer::Route(route) => route.pattern().source(),
            Layer::Middleware { scope, .. } => scope.as_ref().map_or("/", Pattern::source),
            Layer::Mount { pattern, .. } => pattern.source(),
        }
    }

    fn matches(&self, path: &str) -> Result<Option<PatternMatch>, Error> {
        match self {
            Layer::Route(route) => route.pattern().matches(path),
            Layer::Middleware { scope: None, .. } => Ok(Some(PatternMatch {
                params: Params::new(),
                consumed: String::new(),
            })),
            Layer::Middleware {
                scope: Some(pattern),
                ..
            } => pattern.matches(path),
            Layer::Mount { pattern, .. } => pattern.matches(path),
        }
    }
}

/// Result of running a router for one request.
#[derive(Debug)]
pub(crate) enum Outcome {
    Responded(Response),
    /// Nothing responded; the parent continues with its next layer. Carries
    /// the error still looking for a handler, if any.
    Next(Option<Error>),
}

macro_rules! method_shorthands {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("Register a new route answering `", stringify!($name), "` on `pattern`.")]
            pub fn $name<F>(&mut self, pattern: &str, f: F) -> Result<&mut Route, PatternError>
            where
                F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
            {
                Ok(self.route(pattern)?.$name(f))
            }
        )*
    };
}

#[derive(Debug, Default)]
pub struct Router {
    options: RouterOptions,
    layers: Vec<Layer>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RouterOptions) -> Self {
        Self {
            options,
            layers: Vec::new(),
        }
    }

    /// Number of registered layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn route_options(&self) -> PatternOptions {
        PatternOptions {
            case_sensitive: self.options.case_sensitive,
            strict: self.options.strict,
            end: true,
        }
    }

    fn prefix_options(&self) -> PatternOptions {
        PatternOptions {
            case_sensitive: self.options.case_sensitive,
            strict: false,
            end: false,
        }
    }

    /// Register an empty route on `pattern` and return it for chaining.
    pub fn route(&mut self, pattern: &str) -> Result<&mut Route, PatternError> {
        let pattern = Pattern::compile(pattern, self.route_options())?;
        self.layers.push(Layer::Route(Route::new(pattern)));
        match self.layers.last_mut() {
            Some(Layer::Route(route)) => Ok(route),
            _ => unreachable!("last layer is the route just pushed"),
        }
    }

    method_shorthands!(get, post, put, delete, patch, head, options, connect, trace);

    /// Register a new route answering every method on `pattern`.
    pub fn all<F>(&mut self, pattern: &str, f: F) -> Result<&mut Route, PatternError>
    where
        F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        Ok(self.route(pattern)?.all(f))
    }

    /// Middleware for every request that reaches this router.
    pub fn use_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        self.layers.push(Layer::Middleware {
            scope: None,
            handler: Handler::normal(f),
        });
        self
    }

    /// Middleware for requests under `prefix`. The handler sees the prefix
    /// stripped from `url` and appended to `base_url`.
    pub fn use_at<F>(&mut self, prefix: &str, f: F) -> Result<&mut Self, PatternError>
    where
        F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        self.push_scoped(prefix, Handler::normal(f))
    }

    /// Error handler for every failing request that reaches this layer.
    pub fn use_error<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(Error, &'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        self.layers.push(Layer::Middleware {
            scope: None,
            handler: Handler::error(f),
        });
        self
    }

    /// Error handler for failing requests under `prefix`.
    pub fn use_error_at<F>(&mut self, prefix: &str, f: F) -> Result<&mut Self, PatternError>
    where
        F: for<'a> Fn(Error, &'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        self.push_scoped(prefix, Handler::error(f))
    }

    fn push_scoped(&mut self, prefix: &str, handler: Handler) -> Result<&mut Self, PatternError> {
        let scope = Pattern::compile(prefix, self.prefix_options())?;
        self.layers.push(Layer::Middleware {
            scope: Some(scope),
            handler,
        });
        Ok(self)
    }

    /// Mount `router` under `prefix`.
    pub fn mount(&mut self, prefix: &str, router: Router) -> Result<&mut Self, PatternError> {
        let pattern = Pattern::compile(prefix, self.prefix_options())?;
        self.layers.push(Layer::Mount { pattern, router });
        Ok(self)
    }

    /// Run this router for `req` as seen through `view`.
    ///
    /// `parent` holds the parameters this router was entered with. `pending`
    /// is an error raised before this router was reached.
    pub(crate) fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        view: &'a View,
        parent: &'a Params,
        pending: Option<Error>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let path = view.path().to_string();
            let mut pending = pending;
            let mut allowed: Vec<Method> = Vec::new();

            for layer in &self.layers {
                let matched = match layer.matches(&path) {
                    Ok(Some(m)) => m,
                    Ok(None) => {
                        tracing::trace!(
                            kind = layer.kind(),
                            pattern = layer.source(),
                            %path,
                            base_url = view.base_url(),
                            "NO MATCH"
                        );
                        continue;
                    }
                    Err(err) => {
                        tracing::debug!(pattern = layer.source(), %path, error = %err, "Pattern match failed");
                        pending.get_or_insert(err);
                        continue;
                    }
                };
                tracing::trace!(
                    kind = layer.kind(),
                    pattern = layer.source(),
                    %path,
                    base_url = view.base_url(),
                    consumed = %matched.consumed,
                    "MATCH"
                );

                let params = if self.options.merge_params {
                    matched.params.merged_over(parent)
                } else {
                    matched.params
                };

                match layer {
                    Layer::Route(route) => {
                        if pending.is_some() {
                            continue;
                        }
                        if !route.handles(req.method()) {
                            if req.method() == Method::OPTIONS {
                                for method in route.allowed_methods() {
                                    if !allowed.contains(&method) {
                                        allowed.push(method);
                                    }
                                }
                            }
                            continue;
                        }

                        req.enter(view, params);
                        match route.dispatch(req).await {
                            RouteOutcome::Responded(response) => return Outcome::Responded(response),
                            RouteOutcome::Done(err) => pending = err,
                            RouteOutcome::SkipRouter => return leave(req.method(), None, &allowed),
                        }
                    }
                    Layer::Middleware { handler, .. } => {
                        let scoped = view.descend(&matched.consumed);
                        req.enter(&scoped, params);
                        match handler.invoke(req, pending.take()).await {
                            Err(untouched) => pending = untouched,
                            Ok(Flow::Respond(response)) => return Outcome::Responded(response),
                            Ok(Flow::Continue) | Ok(Flow::SkipRoute) => {}
                            Ok(Flow::SkipRouter) => {
                                tracing::trace!(pattern = layer.source(), "next('router')");
                                return leave(req.method(), None, &allowed);
                            }
                            Ok(Flow::Error(err)) => pending = Some(err),
                        }
                    }
                    Layer::Mount { router, .. } => {
                        if pending.is_some() {
                            continue;
                        }
                        let child = view.descend(&matched.consumed);
                        match router.handle(req, &child, &params, None).await {
                            Outcome::Responded(response) => return Outcome::Responded(response),
                            Outcome::Next(err) => pending = err,
                        }
                    }
                }
            }

            leave(req.method(), pending, &allowed)
        })
    }
}

/// Leaving a router that matched routes for an OPTIONS request answers it.
fn leave(method: &Method, pending: Option<Error>, allowed: &[Method]) -> Outcome {
    if pending.is_none() && !allowed.is_empty() && method == Method::OPTIONS {
        return Outcome::Responded(options_response(allowed));
    }
    Outcome::Next(pending)
}

fn options_response(allowed: &[Method]) -> Response {
    let list = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(",");
    let mut response = Response::text(list.clone());
    if let Ok(value) = HeaderValue::from_str(&list) {
        response = response.with_header(header::ALLOW, value);
    }
    response
}
