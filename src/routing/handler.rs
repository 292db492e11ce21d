//! Handlers and the control signals they return.
//!
//! # Design Decisions
//! - A handler returns exactly one `Flow`; responding and signalling `next`
//!   in the same invocation is unrepresentable
//! - Normal and error handlers are distinct variants, selected by the
//!   dispatcher's traversal mode instead of by call signature
//! - A panicking handler is caught, logged and turned into `Error::Panicked`,
//!   whether it panics while building its future or while it runs

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::Error;
use crate::http::{Request, Response};

/// Outcome of one handler invocation.
#[derive(Debug)]
pub enum Flow {
    /// A response was produced; dispatch stops.
    Respond(Response),
    /// Proceed to the next handler or layer (`next()`).
    Continue,
    /// Skip the remaining handlers of the current route (`next('route')`).
    SkipRoute,
    /// Leave the current router entirely (`next('router')`).
    SkipRouter,
    /// Divert to the error pipeline (`next(err)`).
    Error(Error),
}

impl From<Response> for Flow {
    fn from(response: Response) -> Self {
        Flow::Respond(response)
    }
}

impl From<Error> for Flow {
    fn from(err: Error) -> Self {
        Flow::Error(err)
    }
}

impl<E: Into<Error>> From<Result<Response, E>> for Flow {
    fn from(result: Result<Response, E>) -> Self {
        match result {
            Ok(response) => Flow::Respond(response),
            Err(err) => Flow::Error(err.into()),
        }
    }
}

type NormalFn = dyn for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync;
type ErrorFn = dyn for<'a> Fn(Error, &'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync;

/// A registered handler, tagged by the traversal mode it runs in.
#[derive(Clone)]
pub enum Handler {
    Normal(Arc<NormalFn>),
    Error(Arc<ErrorFn>),
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Normal(_) => f.write_str("Handler::Normal"),
            Handler::Error(_) => f.write_str("Handler::Error"),
        }
    }
}

impl Handler {
    pub fn normal<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        Handler::Normal(Arc::new(f))
    }

    pub fn error<F>(f: F) -> Self
    where
        F: for<'a> Fn(Error, &'a mut Request) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        Handler::Error(Arc::new(f))
    }

    pub fn is_error_handler(&self) -> bool {
        matches!(self, Handler::Error(_))
    }

    /// Run the handler in the mode given by `pending`.
    ///
    /// Returns `Err(pending)` untouched when the handler does not take part
    /// in that mode.
    pub(crate) async fn invoke(
        &self,
        req: &mut Request,
        pending: Option<Error>,
    ) -> Result<Flow, Option<Error>> {
        let outcome = {
            let built = match (self, pending) {
                (Handler::Normal(f), None) => {
                    let req = &mut *req;
                    panic::catch_unwind(AssertUnwindSafe(move || {
                        let req = req;
                        f(req)
                    }))
                }
                (Handler::Error(f), Some(err)) => {
                    let req = &mut *req;
                    panic::catch_unwind(AssertUnwindSafe(move || f(err, req)))
                }
                (_, pending) => return Err(pending),
            };

            match built {
                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                Err(payload) => Err(payload),
            }
        };
        match outcome {
            Ok(flow) => Ok(flow),
            Err(_) => {
                tracing::error!(
                    method = %req.method(),
                    url = %req.original_url(),
                    "Handler panicked; routing to error pipeline"
                );
                Ok(Flow::Error(Error::Panicked))
            }
        }
    }
}
