//! Server-side redirect resolution.
//!
//! # Responsibilities
//! - Issue the upstream request and follow upstream redirects internally
//! - Jump to the upstream root whenever a hop lands on a not-found page
//! - Bound the chain by `max_redirect_hops`, then fetch the root
//!
//! # Design Decisions
//! - Hops are sequential; each target depends on the previous response
//! - Network errors are fatal for the request, never retried here
//! - Redirects leaving the upstream origin are terminal and handed to the
//!   response rewriter

use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::upstream::client::{Upstream, UpstreamResponse, UpstreamTarget};
use crate::upstream::error::ProxyResult;

/// Issue `target` and resolve any upstream redirect chain.
pub async fn resolve(
    upstream: &dyn Upstream,
    target: &UpstreamTarget,
    config: &ProxyConfig,
) -> ProxyResult<UpstreamResponse> {
    let mut current = target.clone();

    for hop in 0..config.max_redirect_hops {
        let response = upstream.send(current.clone()).await?;

        if !response.is_redirect() {
            return Ok(response);
        }
        // Relative locations resolve against the upstream origin, not the hop.
        let Some(next) = response.location().map(|l| config.upstream_root().join(l.trim())) else {
            return Ok(response);
        };

        metrics::record_redirect_hop();

        current = match next {
            Ok(next) if !config.is_upstream_url(&next) => {
                tracing::debug!(hop, status = %response.status, "Redirect leaves upstream origin");
                return Ok(response);
            }
            Ok(next) if config.not_found_patterns.matches(next.path()) => {
                tracing::info!(hop, path = %next.path(), "Redirect to not-found page, fetching upstream root");
                metrics::record_not_found_contained("redirect");
                target.to_root(config)
            }
            Ok(next) => {
                tracing::debug!(hop, status = %response.status, path = %next.path(), "Following upstream redirect");
                current.follow(next, response.status)
            }
            Err(e) => {
                tracing::warn!(hop, error = %e, "Unparseable redirect location, fetching upstream root");
                target.to_root(config)
            }
        };
    }

    tracing::warn!(
        max_hops = config.max_redirect_hops,
        "Redirect budget exhausted, serving upstream root"
    );
    upstream.send(target.to_root(config)).await
}
