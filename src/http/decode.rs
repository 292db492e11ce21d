//! Percent-decoding for paths, parameters and query strings.
//!
//! Decoding is strict: a `%` not followed by two hex digits, or escapes that
//! do not form valid UTF-8, are errors rather than literal text.

use std::collections::BTreeMap;

use crate::error::Error;

/// Decode one path component. `+` is kept as-is.
pub fn decode_component(raw: &str) -> Result<String, Error> {
    if !raw.contains('%') {
        return Ok(raw.to_string());
    }
    if !escapes_well_formed(raw) {
        return Err(Error::decode(raw));
    }
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| Error::decode(raw))
}

/// Decode a whole path segment by segment, so an error names the bad segment.
pub fn decode_path(raw: &str) -> Result<String, Error> {
    if !raw.contains('%') {
        return Ok(raw.to_string());
    }
    let segments = raw
        .split('/')
        .map(decode_component)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

/// Decode a query-string key or value. `+` means space.
pub fn decode_query_component(raw: &str) -> Result<String, Error> {
    if raw.contains('+') {
        decode_component(&raw.replace('+', " "))
    } else {
        decode_component(raw)
    }
}

/// Parse `a=1&b=two` into a map. Repeated keys: the last value wins.
pub fn parse_query(raw: &str) -> Result<BTreeMap<String, String>, Error> {
    let mut query = BTreeMap::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        query.insert(decode_query_component(key)?, decode_query_component(value)?);
    }
    Ok(query)
}

/// Split a raw url into path and query string (without the `?`).
pub fn split_url(url: &str) -> (&str, &str) {
    url.split_once('?').unwrap_or((url, ""))
}

fn escapes_well_formed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3);
            match hex {
                Some(h) if h.iter().all(u8::is_ascii_hexdigit) => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}
