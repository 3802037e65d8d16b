//! Header sanitization.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Replace the client's Host with an X-Forwarded-Host marker
//!
//! # Design Decisions
//! - The upstream never sees the public Host header
//! - The marker carries the Host the client addressed; a client-supplied
//!   X-Forwarded-Host is overwritten or removed, never trusted

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Connection-scoped headers that must not be forwarded by a proxy.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in &named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Sanitize a copy of the client's headers for the upstream request.
pub fn sanitize_request_headers(incoming: &HeaderMap, origin_host: Option<&str>) -> HeaderMap {
    let mut headers = incoming.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    // The transport negotiates encodings it can decode itself.
    headers.remove(header::ACCEPT_ENCODING);
    headers.remove(header::CONTENT_LENGTH);

    match origin_host.and_then(|h| HeaderValue::from_str(h).ok()) {
        Some(value) => {
            headers.insert(X_FORWARDED_HOST, value);
        }
        None => {
            headers.remove(X_FORWARDED_HOST);
        }
    }
    headers
}
