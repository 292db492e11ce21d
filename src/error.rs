//! Dispatch-time error taxonomy.
//!
//! # Responsibilities
//! - Carry handler-raised and decode errors through the error pipeline
//! - Classify every error into an HTTP status
//! - Decide whether the message may be shown to the client
//!
//! # Design Decisions
//! - "No route matched" is not an error; it is an unhandled dispatch outcome
//! - 4xx messages are exposed, 5xx messages never leave the process

use axum::http::StatusCode;
use thiserror::Error;

/// Boxed source error for opaque handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error travelling through the error pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed percent-encoding in the path, a parameter or the query string.
    #[error("Failed to decode param '{value}'")]
    Decode { value: String },

    /// Error raised by a handler with an explicit status.
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    /// Opaque failure from handler code.
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    /// A handler panicked instead of returning a signal.
    #[error("handler panicked during dispatch")]
    Panicked,
}

impl Error {
    /// Error with an explicit status and a client-facing message.
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Wrap any error as an opaque handler failure (500).
    pub fn handler(source: impl Into<BoxError>) -> Self {
        Self::Handler(source.into())
    }

    pub(crate) fn decode(value: impl Into<String>) -> Self {
        Self::Decode {
            value: value.into(),
        }
    }

    /// HTTP status this error resolves to at the terminal responder.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Decode { .. } => StatusCode::BAD_REQUEST,
            Error::Http { status, .. } => *status,
            Error::Handler(_) | Error::Panicked => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is safe to send to the client.
    pub fn expose(&self) -> bool {
        self.status().is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_is_client_error() {
        let err = Error::decode("%E0%A4%A");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.expose());
        assert_eq!(err.to_string(), "Failed to decode param '%E0%A4%A'");
    }

    #[test]
    fn test_handler_error_is_hidden() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "db password leaked");
        let err = Error::handler(io);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.expose());
    }

    #[test]
    fn test_http_error_keeps_status() {
        let err = Error::http(StatusCode::FORBIDDEN, "nope");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(err.expose());
        assert_eq!(err.to_string(), "nope");
    }
}
