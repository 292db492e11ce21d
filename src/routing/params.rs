//! Captured route parameters.
//!
//! # Design Decisions
//! - Named captures use their name as key, wildcards use their occurrence
//!   index (`"0"`, `"1"`, ...)
//! - Merging with ancestors is nearest-descendant-wins for named keys;
//!   indexed keys are shifted past the ancestor's so both survive

use std::collections::BTreeMap;

use serde::Serialize;

/// Decoded parameter values visible to a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Layer params on top of `parent`, as seen by a router with `merge_params`.
    pub fn merged_over(&self, parent: &Params) -> Params {
        if parent.is_empty() {
            return self.clone();
        }

        let offset = parent.0.keys().filter_map(|k| index_of(k)).map(|i| i + 1).max().unwrap_or(0);
        let mut merged = parent.clone();
        for (key, value) in &self.0 {
            match index_of(key) {
                Some(i) if offset > 0 => merged.insert((i + offset).to_string(), value.clone()),
                _ => merged.insert(key.clone(), value.clone()),
            }
        }
        merged
    }
}

fn index_of(key: &str) -> Option<usize> {
    key.parse().ok()
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
