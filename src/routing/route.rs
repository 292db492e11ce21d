//! A route: one path pattern with an ordered, method-filtered handler chain.
//!
//! # Responsibilities
//! - Keep handlers in registration order
//! - Run the chain for one request and translate handler signals
//!
//! # Design Decisions
//! - HEAD falls back to GET handlers unless the route registers HEAD itself
//! - Error handlers in the chain only see errors raised earlier in it
//! - Only normal handlers decide which methods the route answers

use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::error::Error;
use crate::http::{Request, Response};
use crate::routing::handler::{Flow, Handler};
use crate::routing::pattern::Pattern;

/// Which methods a chain entry applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    All,
    Only(Method),
}

impl MethodFilter {
    fn matches(&self, method: &Method) -> bool {
        match self {
            MethodFilter::All => true,
            MethodFilter::Only(m) => m == method,
        }
    }
}

/// Result of running a route's chain.
#[derive(Debug)]
pub(crate) enum RouteOutcome {
    Responded(Response),
    /// Chain finished or `SkipRoute`; carries an unhandled error, if any.
    Done(Option<Error>),
    SkipRouter,
}

macro_rules! method_fns {
    ($($name:ident => $method:expr),* $(,)?) => {
        $(
            #[doc = concat!("Append a handler for `", stringify!($method), "` requests.")]
            pub fn $name<F>(&mut self, f: F) -> &mut Self
            where
                F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
            {
                self.on($method, f)
            }
        )*
    };
}

#[derive(Debug)]
pub struct Route {
    pattern: Pattern,
    stack: Vec<(MethodFilter, Handler)>,
}

impl Route {
    pub(crate) fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            stack: Vec::new(),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Append a handler for one method.
    pub fn on<F>(&mut self, method: Method, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        self.stack.push((MethodFilter::Only(method), Handler::normal(f)));
        self
    }

    /// Append a handler for every method.
    pub fn all<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        self.stack.push((MethodFilter::All, Handler::normal(f)));
        self
    }

    /// Append an error handler for errors raised earlier in this chain.
    pub fn error<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(Error, &'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        self.stack.push((MethodFilter::All, Handler::error(f)));
        self
    }

    method_fns! {
        get => Method::GET,
        post => Method::POST,
        put => Method::PUT,
        delete => Method::DELETE,
        patch => Method::PATCH,
        head => Method::HEAD,
        options => Method::OPTIONS,
        connect => Method::CONNECT,
        trace => Method::TRACE,
    }

    fn normal_filters(&self) -> impl Iterator<Item = &MethodFilter> {
        self.stack
            .iter()
            .filter(|(_, h)| !h.is_error_handler())
            .map(|(filter, _)| filter)
    }

    fn registers(&self, method: &Method) -> bool {
        self.normal_filters()
            .any(|f| matches!(f, MethodFilter::Only(m) if m == method))
    }

    fn effective_method(&self, method: &Method) -> Method {
        if method == Method::HEAD && !self.registers(&Method::HEAD) {
            Method::GET
        } else {
            method.clone()
        }
    }

    /// Whether any normal handler answers `method`.
    pub fn handles(&self, method: &Method) -> bool {
        let method = self.effective_method(method);
        self.normal_filters().any(|f| f.matches(&method))
    }

    /// Methods advertised in an automatic OPTIONS answer.
    pub(crate) fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for filter in self.normal_filters() {
            if let MethodFilter::Only(m) = filter {
                if !methods.contains(m) {
                    methods.push(m.clone());
                }
            }
        }
        if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
            methods.push(Method::HEAD);
        }
        methods
    }

    pub(crate) async fn dispatch(&self, req: &mut Request) -> RouteOutcome {
        let method = self.effective_method(req.method());
        let mut pending: Option<Error> = None;

        for (filter, handler) in &self.stack {
            if !filter.matches(&method) {
                continue;
            }

            let flow = match handler.invoke(req, pending.take()).await {
                Ok(flow) => flow,
                Err(untouched) => {
                    pending = untouched;
                    continue;
                }
            };

            match flow {
                Flow::Respond(response) => return RouteOutcome::Responded(response),
                Flow::Continue => {}
                Flow::SkipRoute => {
                    tracing::trace!(route = %self.pattern.source(), "next('route')");
                    return RouteOutcome::Done(None);
                }
                Flow::SkipRouter => {
                    tracing::trace!(route = %self.pattern.source(), "next('router')");
                    return RouteOutcome::SkipRouter;
                }
                Flow::Error(err) => pending = Some(err),
            }
        }

        RouteOutcome::Done(pending)
    }
}
