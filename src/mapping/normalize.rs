//! URL normalization shared by stored patterns and incoming requests.
//!
//! # Responsibilities
//! - Canonicalize a URL so stored patterns and request URLs compare directly
//! - Split a URL into path and query
//! - Parse a query string into an unordered key/value map
//!
//! # Design Decisions
//! - Lower-case everything; matching is case-insensitive end to end
//! - Strip `/` and `?` from both ends until stable, so normalizing twice is
//!   the same as normalizing once
//! - Query strings are kept in the canonical form; the matcher compares
//!   them as unordered maps, never as strings

use std::collections::BTreeMap;

/// Canonical form of a URL: lower-cased, with leading/trailing `/` and a
/// trailing bare `?` removed.
pub fn normalize(url: &str) -> String {
    url.to_lowercase()
        .trim_matches(|c| c == '/' || c == '?')
        .to_string()
}

/// Split a URL into its path and optional query component on the first `?`.
pub fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

/// Parse a query string into an unordered map.
///
/// Parameter order is irrelevant; a repeated key keeps its last value.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Restore a `://` scheme separator that path canonicalization collapsed to
/// `:/`, e.g. a request for `/http:/example.com/page`.
pub fn restore_scheme_separator(url: &str) -> String {
    if url.contains("://") {
        return url.to_string();
    }
    url.replacen(":/", "://", 1)
}
