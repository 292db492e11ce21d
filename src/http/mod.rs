//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body limit)
//!     → request.rs (method, raw url, headers, buffered body)
//!     → [routing::Dispatcher decides who answers]
//!     → response.rs (status, headers, body)
//!     → Send to client
//! ```

pub mod decode;
pub mod request;
pub mod response;
pub mod server;

pub use request::Request;
pub use response::Response;
pub use server::{HttpServer, X_REQUEST_ID};
