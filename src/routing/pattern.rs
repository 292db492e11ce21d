//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile `/users/:id(\d+)/files/*` style patterns into a regex
//! - Match a request path, either fully (routes) or as a segment-bounded
//!   prefix (mounts and middleware)
//! - Extract and percent-decode captured parameters
//!
//! # Design Decisions
//! - Literals are case-insensitive unless the router asks otherwise
//! - Non-strict patterns ignore one trailing slash on either side
//! - `*` matches one or more characters across segments
//! - `?`, `+` and `(` outside a parameter are plain literals
//! - A malformed escape inside a capture is an error, never a non-match

use regex::Regex;
use thiserror::Error;

use crate::error::Error;
use crate::http::decode::decode_component;
use crate::routing::params::Params;

/// Default constraint for a named parameter: one path segment.
const SEGMENT: &str = "[^/]+";
const TAIL: &str = "tail";

/// Errors raised while compiling a pattern at registration time.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("missing parameter name at offset {offset} in pattern '{pattern}'")]
    MissingName { pattern: String, offset: usize },

    #[error("unbalanced parameter constraint in pattern '{pattern}'")]
    UnbalancedGroup { pattern: String },

    #[error("invalid pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Compilation switches for a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOptions {
    /// Compare literals case-sensitively.
    pub case_sensitive: bool,
    /// Treat a trailing slash as significant.
    pub strict: bool,
    /// Require the whole path to match (routes) instead of a prefix (mounts).
    pub end: bool,
}

impl PatternOptions {
    pub fn route() -> Self {
        Self {
            case_sensitive: false,
            strict: false,
            end: true,
        }
    }

    pub fn prefix() -> Self {
        Self {
            end: false,
            ..Self::route()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Key {
    Named(String),
    Index(usize),
}

/// A successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Decoded captures.
    pub params: Params,
    /// The literal prefix of the input accounted for by the pattern.
    pub consumed: String,
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    keys: Vec<(Key, String)>,
    end: bool,
}

impl Pattern {
    pub fn compile(source: &str, options: PatternOptions) -> Result<Self, PatternError> {
        let source = if source.is_empty() { "/" } else { source };
        let trimmed = if !options.strict && source.ends_with('/') {
            &source[..source.len() - 1]
        } else {
            source
        };

        let mut body = String::new();
        let mut literal = String::new();
        let mut keys = Vec::new();
        let mut wildcards = 0;
        let mut chars = trimmed.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                ':' => {
                    let mut name = String::new();
                    while let Some(&(_, n)) = chars.peek() {
                        if !(n.is_ascii_alphanumeric() || n == '_') {
                            break;
                        }
                        name.push(n);
                        chars.next();
                    }
                    if name.is_empty() {
                        return Err(PatternError::MissingName {
                            pattern: source.to_string(),
                            offset,
                        });
                    }

                    let constraint = if chars.peek().map(|&(_, n)| n) == Some('(') {
                        chars.next();
                        read_group(&mut chars).ok_or_else(|| PatternError::UnbalancedGroup {
                            pattern: source.to_string(),
                        })?
                    } else {
                        SEGMENT.to_string()
                    };
                    let optional = chars.peek().map(|&(_, n)| n) == Some('?');
                    if optional {
                        chars.next();
                    }

                    let group_name = format!("p{}", keys.len());
                    let group = format!("(?P<{group_name}>{constraint})");
                    if optional && literal.ends_with('/') {
                        literal.pop();
                        flush_literal(&mut body, &mut literal);
                        body.push_str(&format!("(?:/{group})?"));
                    } else {
                        flush_literal(&mut body, &mut literal);
                        body.push_str(&group);
                        if optional {
                            body.push('?');
                        }
                    }
                    keys.push((Key::Named(name), group_name));
                }
                '*' => {
                    flush_literal(&mut body, &mut literal);
                    let group_name = format!("p{}", keys.len());
                    body.push_str(&format!("(?P<{group_name}>.+)"));
                    keys.push((Key::Index(wildcards), group_name));
                    wildcards += 1;
                }
                other => literal.push(other),
            }
        }
        flush_literal(&mut body, &mut literal);

        let flags = if options.case_sensitive { "" } else { "(?i)" };
        let anchored = if options.end {
            let slash = if options.strict { "" } else { "/?" };
            format!("{flags}^{body}{slash}$")
        } else if trimmed.ends_with('/') {
            format!("{flags}^{body}(?P<{TAIL}>)")
        } else {
            format!("{flags}^{body}(?P<{TAIL}>/|$)")
        };

        let regex = Regex::new(&anchored).map_err(|source_err| PatternError::Regex {
            pattern: source.to_string(),
            source: source_err,
        })?;

        Ok(Self {
            source: source.to_string(),
            regex,
            keys,
            end: options.end,
        })
    }

    /// The pattern as registered.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match `path` (no query string). `Ok(None)` is a plain non-match.
    pub fn matches(&self, path: &str) -> Result<Option<PatternMatch>, Error> {
        let Some(caps) = self.regex.captures(path) else {
            return Ok(None);
        };

        let mut params = Params::new();
        for (key, group) in &self.keys {
            let Some(value) = caps.name(group) else {
                continue;
            };
            let decoded = decode_component(value.as_str())?;
            match key {
                Key::Named(name) => params.insert(name.clone(), decoded),
                Key::Index(i) => params.insert(i.to_string(), decoded),
            }
        }

        let consumed = if self.end {
            path.len()
        } else {
            caps.name(TAIL).map_or(path.len(), |tail| tail.start())
        };

        Ok(Some(PatternMatch {
            params,
            consumed: path[..consumed].to_string(),
        }))
    }
}

fn flush_literal(body: &mut String, literal: &mut String) {
    if !literal.is_empty() {
        body.push_str(&regex::escape(literal));
        literal.clear();
    }
}

/// Read an inline constraint up to its balancing `)`. The opening `(` is consumed.
fn read_group(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> Option<String> {
    let mut depth = 1;
    let mut group = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => {
                group.push(c);
                let (_, escaped) = chars.next()?;
                group.push(escaped);
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(group);
                }
            }
            _ => {}
        }
        group.push(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(p: &str) -> Pattern {
        Pattern::compile(p, PatternOptions::route()).unwrap()
    }

    fn prefix(p: &str) -> Pattern {
        Pattern::compile(p, PatternOptions::prefix()).unwrap()
    }

    #[test]
    fn test_literal_case_insensitive() {
        let p = route("/Case/Path");
        assert!(p.matches("/case/path").unwrap().is_some());
        assert!(p.matches("/CASE/PATH").unwrap().is_some());
        assert!(p.matches("/case/path/more").unwrap().is_none());
    }

    #[test]
    fn test_case_sensitive_option() {
        let options = PatternOptions {
            case_sensitive: true,
            ..PatternOptions::route()
        };
        let p = Pattern::compile("/Case/Path", options).unwrap();
        assert!(p.matches("/Case/Path").unwrap().is_some());
        assert!(p.matches("/case/path").unwrap().is_none());
    }

    #[test]
    fn test_trailing_slash_loose() {
        let p = route("/trail/");
        assert!(p.matches("/trail").unwrap().is_some());
        assert!(p.matches("/trail/").unwrap().is_some());

        let p = route("/trail");
        assert!(p.matches("/trail/").unwrap().is_some());
    }

    #[test]
    fn test_trailing_slash_strict() {
        let options = PatternOptions {
            strict: true,
            ..PatternOptions::route()
        };
        let p = Pattern::compile("/trail/", options).unwrap();
        assert!(p.matches("/trail/").unwrap().is_some());
        assert!(p.matches("/trail").unwrap().is_none());
    }

    #[test]
    fn test_named_param() {
        let p = route("/users/:id");
        let m = p.matches("/users/42").unwrap().unwrap();
        assert_eq!(m.params.get("id"), Some("42"));
        assert!(p.matches("/users/42/extra").unwrap().is_none());
        assert!(p.matches("/users/").unwrap().is_none());
    }

    #[test]
    fn test_constrained_param() {
        let p = route(r"/nr/:id(\d+)");
        assert_eq!(p.matches("/nr/0").unwrap().unwrap().params.get("id"), Some("0"));
        assert!(p.matches("/nr/abc").unwrap().is_none());
    }

    #[test]
    fn test_optional_param() {
        let p = route("/posts/:slug?");
        assert!(p.matches("/posts").unwrap().unwrap().params.is_empty());
        let m = p.matches("/posts/hello").unwrap().unwrap();
        assert_eq!(m.params.get("slug"), Some("hello"));
    }

    #[test]
    fn test_wildcard() {
        let p = route("/file/*");
        let m = p.matches("/file/a/b/c").unwrap().unwrap();
        assert_eq!(m.params.get("0"), Some("a/b/c"));
        assert!(p.matches("/file").unwrap().is_none());
    }

    #[test]
    fn test_multiple_wildcards() {
        let p = route("/a/*/b/*");
        let m = p.matches("/a/x/y/b/z").unwrap().unwrap();
        assert_eq!(m.params.get("0"), Some("x/y"));
        assert_eq!(m.params.get("1"), Some("z"));
    }

    #[test]
    fn test_param_decoding() {
        let p = route("/p/:x");
        let m = p.matches("/p/hello%20world").unwrap().unwrap();
        assert_eq!(m.params.get("x"), Some("hello world"));
    }

    #[test]
    fn test_malformed_escape_is_error() {
        let p = route("/decode/:p");
        assert!(matches!(p.matches("/decode/%E0%A4%A"), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_prefix_boundary() {
        let p = prefix("/api");
        assert_eq!(p.matches("/api/v1/users").unwrap().unwrap().consumed, "/api");
        assert_eq!(p.matches("/api").unwrap().unwrap().consumed, "/api");
        assert_eq!(p.matches("/API/").unwrap().unwrap().consumed, "/API");
        assert!(p.matches("/apiary").unwrap().is_none());
    }

    #[test]
    fn test_root_prefix_consumes_nothing() {
        let p = prefix("/");
        let m = p.matches("/root/test").unwrap().unwrap();
        assert_eq!(m.consumed, "");
    }

    #[test]
    fn test_prefix_with_param() {
        let p = prefix("/mp/merge/t/:tenant");
        let m = p.matches("/mp/merge/t/acme/users/7").unwrap().unwrap();
        assert_eq!(m.consumed, "/mp/merge/t/acme");
        assert_eq!(m.params.get("tenant"), Some("acme"));
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            Pattern::compile("/x/:/y", PatternOptions::route()),
            Err(PatternError::MissingName { .. })
        ));
        assert!(matches!(
            Pattern::compile(r"/x/:id(\d+", PatternOptions::route()),
            Err(PatternError::UnbalancedGroup { .. })
        ));
        assert!(matches!(
            Pattern::compile("/x/:id([)", PatternOptions::route()),
            Err(PatternError::Regex { .. })
        ));
    }
}
