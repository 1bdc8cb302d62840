// crates/substrate-server/src/headers.rs
// ============================================================================
// Module: Header Extraction
// Description: Converts an axum HeaderMap into the lowercased string map the
//              Identity & Context Resolver expects.
// Purpose: Keep the one HTTP-specific translation step isolated from the
//          transport-agnostic resolver.
// Dependencies: axum
// ============================================================================

use std::collections::BTreeMap;

use axum::http::HeaderMap;

/// Builds the lowercased header map [`substrate_gate::resolve_context`] reads.
///
/// Header names are already case-insensitively stored by axum; this only
/// copies them into the plain `BTreeMap` the resolver is written against so
/// it stays transport-agnostic (stdio and test callers build the same map
/// by hand).
#[must_use]
pub fn to_header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (name, value) in headers {
        if let Ok(text) = value.to_str() {
            map.insert(name.as_str().to_ascii_lowercase(), text.to_owned());
        }
    }
    map
}
