//! Per-request context threaded through dispatch.
//!
//! # Responsibilities
//! - Hold the parsed inbound request (method, url, headers, body)
//! - Expose the current mount view (`url`, `base_url`, `path`) and the
//!   parameters in scope for the running handler
//! - Carry typed per-request state between handlers (`extensions`)
//!
//! # Design Decisions
//! - The dispatcher installs a fresh view and parameter set before every
//!   handler call; handlers read them but cannot steer traversal with them
//! - `original_url` never changes after construction

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{Extensions, HeaderMap, Method};

use crate::error::Error;
use crate::http::decode::{decode_path, parse_query, split_url};
use crate::routing::params::Params;
use crate::routing::view::View;

/// Request context as seen by handlers.
#[derive(Debug)]
pub struct Request {
    method: Method,
    original_url: String,
    headers: HeaderMap,
    body: Bytes,
    query: BTreeMap<String, String>,
    view: View,
    path: String,
    params: Params,
    extensions: Extensions,
}

impl Request {
    /// Build a context from an already-parsed method and raw url (path + query).
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let original_url = url.into();
        let view = View::root(&original_url);
        let path = view.path().to_string();
        Self {
            method,
            original_url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            query: BTreeMap::new(),
            view,
            path,
            params: Params::new(),
            extensions: Extensions::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The url exactly as received, never rewritten.
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// Url relative to the router running the current handler.
    pub fn url(&self) -> &str {
        self.view.url()
    }

    /// Prefix consumed by the mounts leading to the current router.
    pub fn base_url(&self) -> &str {
        self.view.base_url()
    }

    /// Decoded `url` without query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text, if present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Decode path and query once at entry.
    pub(crate) fn decode(&mut self) -> Result<(), Error> {
        let (path, query) = split_url(&self.original_url);
        self.path = decode_path(path)?;
        self.query = parse_query(query)?;
        Ok(())
    }

    /// Install the view and parameters for the next handler call.
    pub(crate) fn enter(&mut self, view: &View, params: Params) {
        self.path = decode_path(view.path()).unwrap_or_else(|_| view.path().to_string());
        self.view = view.clone();
        self.params = params;
    }
}
