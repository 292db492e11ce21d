//! Routing and middleware dispatch.
//!
//! # Data Flow
//! ```text
//! Request (method, raw url, headers, body)
//!     → dispatcher.rs (decode once, enter root view)
//!     → router.rs (scan layers in order)
//!         → pattern.rs (match remaining path, capture params)
//!         → route.rs (method-filtered handler chain)
//!         → mounted Router (descend view, recurse)
//!     → handler.rs (Flow: respond / continue / skip / error)
//!     → Response, 404 responder, or terminal error responder
//! ```
//!
//! # Design Decisions
//! - The router tree is built once and shared read-only across requests
//! - Per-request state lives in `Request` and is owned by one task
//! - First matching layer wins; later layers only run on `Continue`

pub mod dispatcher;
pub mod handler;
pub mod params;
pub mod pattern;
pub mod route;
pub mod router;
pub mod view;

pub use dispatcher::Dispatcher;
pub use handler::{Flow, Handler};
pub use params::Params;
pub use pattern::{Pattern, PatternError, PatternMatch, PatternOptions};
pub use route::{MethodFilter, Route};
pub use router::{Router, RouterOptions};
pub use view::View;
