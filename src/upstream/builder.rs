//! Upstream request construction.
//!
//! Pure mapping from the client's request to the first upstream target. No
//! network I/O happens here.

use axum::http::Method;

use crate::config::{DocumentPolicy, ProxyConfig};
use crate::http::request::IncomingRequest;
use crate::routing::RouteKind;
use crate::security::headers::sanitize_request_headers;
use crate::upstream::client::UpstreamTarget;

/// Methods that never carry a body upstream.
pub fn carries_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

/// Build the upstream target for an incoming request.
pub fn build(incoming: &IncomingRequest, config: &ProxyConfig, route_kind: RouteKind) -> UpstreamTarget {
    let path = match (config.document_policy, route_kind) {
        (DocumentPolicy::AlwaysHome, RouteKind::Document) => "/",
        _ => incoming.path.as_str(),
    };

    // set_path keeps the upstream authority even for paths like "//other.host".
    let mut url = config.upstream_origin.clone();
    url.set_path(path);
    url.set_query(incoming.query.as_deref());

    let body = if carries_body(&incoming.method) {
        incoming.body.clone()
    } else {
        None
    };

    UpstreamTarget {
        method: incoming.method.clone(),
        url,
        headers: sanitize_request_headers(&incoming.headers, incoming.origin_host.as_deref()),
        body,
    }
}
