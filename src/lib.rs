//! Express-compatible HTTP routing and middleware dispatch.
//!
//! Build a [`Router`] tree, wrap it in a [`Dispatcher`], and either call
//! [`Dispatcher::serve`] directly or put it behind [`HttpServer`].

pub mod compat;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::AppConfig;
pub use error::Error;
pub use http::{HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use routing::{Dispatcher, Flow, Route, Router, RouterOptions};
