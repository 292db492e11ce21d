//! Mount view: what a router sees of the request url.
//!
//! A view is an immutable value. Descending into a mount produces a new view
//! and the caller keeps its own, so nothing has to be restored on the way out.

use crate::http::decode::split_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    base_url: String,
    url: String,
}

impl View {
    /// View of the root router: nothing consumed yet.
    pub fn root(original_url: &str) -> Self {
        Self {
            base_url: String::new(),
            url: original_url.to_string(),
        }
    }

    /// Prefix consumed to reach the current router.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Remaining url (with query string) relative to the current router.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Remaining path without the query string.
    pub fn path(&self) -> &str {
        split_url(&self.url).0
    }

    /// View for a mount that matched `consumed`, a prefix of `self.path()`.
    pub fn descend(&self, consumed: &str) -> View {
        if consumed.is_empty() {
            return self.clone();
        }

        let rest = self.url.get(consumed.len()..).unwrap_or_default();
        let url = if rest.starts_with('/') {
            rest.to_string()
        } else {
            format!("/{rest}")
        };
        let consumed = consumed.strip_suffix('/').unwrap_or(consumed);

        View {
            base_url: format!("{}{}", self.base_url, consumed),
            url,
        }
    }
}
