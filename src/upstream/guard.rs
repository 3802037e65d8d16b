//! Not-found containment.
//!
//! A document route answered with a not-found HTML page is replaced by the
//! upstream root document, served as 200. Assets and non-HTML answers pass
//! through untouched.

use axum::http::StatusCode;

use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::routing::RouteKind;
use crate::upstream::client::{Upstream, UpstreamResponse, UpstreamTarget};
use crate::upstream::error::ProxyResult;

/// Inspect the final upstream response and substitute the root document if
/// it is a not-found page for a document route.
///
/// The root fetch is a single request. If the root itself redirects, that
/// redirect is passed through as-is.
pub async fn guard(
    upstream: &dyn Upstream,
    response: UpstreamResponse,
    route_kind: RouteKind,
    target: &UpstreamTarget,
    config: &ProxyConfig,
) -> ProxyResult<UpstreamResponse> {
    if !route_kind.is_document() || !config.is_not_found_status(response.status) || !response.is_html() {
        return Ok(response);
    }

    tracing::info!(
        status = %response.status,
        path = %target.url.path(),
        "Upstream not-found page, substituting upstream root"
    );
    metrics::record_not_found_contained("guard");
    drop(response);

    let mut root = upstream.send(target.to_root(config)).await?;
    if root.is_redirect() {
        tracing::debug!(status = %root.status, "Upstream root redirected, passing through");
    } else {
        root.status = StatusCode::OK;
    }
    Ok(root)
}
