//! Permalink canonicalization.
//!
//! The canonical form is what deduplication and the watermark key on, so it
//! must be stable across runs: the query string is dropped, along with a bare
//! trailing `?`. Fragments are kept.

use url::Url;

/// Canonicalize a (possibly already resolved) page URL.
///
/// `canonicalize(canonicalize(u)) == canonicalize(u)` for every input.
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_query(None);
            url.to_string()
        }
        Err(_) => strip_query(trimmed),
    }
}

/// Drop the query from a URL-like string that `url` cannot parse.
fn strip_query(raw: &str) -> String {
    let (before_fragment, fragment) = match raw.find('#') {
        Some(pos) => raw.split_at(pos),
        None => (raw, ""),
    };
    let path = match before_fragment.find('?') {
        Some(pos) => &before_fragment[..pos],
        None => before_fragment,
    };
    format!("{path}{fragment}").trim().to_string()
}
