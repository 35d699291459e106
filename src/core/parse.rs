//! Reading emitted policies back, for tests and diagnostics.

use crate::constants::{NONCE_PREFIX, SUFFIX_QUOTE};
use indexmap::IndexMap;

/// Splits a `Content-Security-Policy` value into `name -> sources`, keeping
/// header order. Names are lowercased; when a name repeats, the first one
/// wins, as browsers do.
pub fn parse_policy(header: &str) -> IndexMap<String, String> {
    let mut directives = IndexMap::new();

    for part in header.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (name, value) = match part.split_once(char::is_whitespace) {
            Some((name, value)) => (name, value.trim()),
            None => (part, ""),
        };

        directives
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.to_string());
    }

    directives
}

/// Every nonce value in a source list, without the `'nonce-` wrapper.
pub fn nonces_in(sources: &str) -> Vec<&str> {
    sources
        .split_whitespace()
        .filter_map(|token| token.strip_prefix(NONCE_PREFIX)?.strip_suffix(SUFFIX_QUOTE))
        .collect()
}

/// The nonce carried by `script-src`, if any.
pub fn extract_nonce(header: &str) -> Option<String> {
    let directives = parse_policy(header);
    let script_src = directives.get(crate::constants::SCRIPT_SRC)?;
    nonces_in(script_src).first().map(|nonce| nonce.to_string())
}
