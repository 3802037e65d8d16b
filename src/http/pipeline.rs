//! Per-request proxy pipeline.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → classify path (asset / document)
//!     → capture request (buffer body if any)
//!     → build upstream target
//!     → resolve redirects
//!     → contain not-found pages
//!     → rewrite headers and HTML
//!     → Response<Body>
//! ```
//!
//! `handle` is the error boundary: any failure before response headers
//! are produced becomes a 502. Failures after that point (mid-body) can only
//! abort the body stream.
//!
//! The request deadline covers the upstream exchanges up to the final
//! response headers. Body streaming is bounded only by the transport's
//! read-idle timeout.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::config::ProxyConfig;
use crate::http::request::{request_id, IncomingRequest};
use crate::http::response;
use crate::observability::metrics;
use crate::rewrite::{rewrite_response, RewriteContext};
use crate::routing::classify;
use crate::upstream::{builder, guard, redirect, ProxyError, ProxyResult, Upstream};

/// Everything needed to proxy one request. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<ProxyConfig>,
    upstream: Arc<dyn Upstream>,
}

impl Pipeline {
    pub fn new(config: Arc<ProxyConfig>, upstream: Arc<dyn Upstream>) -> Self {
        Self { config, upstream }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Proxy a request, turning every failure into a 502.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request_id(request.headers());
        let method = request.method().to_string();
        let path = request.uri().path().to_string();

        let response = match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(request_id = %request_id, method = %method, path = %path, error = %e, "Proxy request failed");
                response::bad_gateway(&e)
            }
        };

        metrics::record_request(&method, response.status().as_u16(), start);
        response
    }

    /// Run the pipeline stages; errors are left to the caller.
    pub async fn dispatch(&self, request: Request<Body>) -> ProxyResult<Response> {
        let config = self.config.as_ref();
        let route_kind = classify(request.uri().path());

        let incoming = IncomingRequest::from_request(request, config.max_request_body).await?;
        tracing::debug!(
            method = %incoming.method,
            path = %incoming.path,
            route_kind = %route_kind,
            "Proxying request"
        );

        let target = builder::build(&incoming, config, route_kind);
        let upstream = self.upstream.as_ref();
        let exchange = async {
            let resolved = redirect::resolve(upstream, &target, config).await?;
            guard::guard(upstream, resolved, route_kind, &target, config).await
        };
        let contained = tokio::time::timeout(config.request_timeout, exchange)
            .await
            .map_err(|_| {
                metrics::record_upstream_error();
                ProxyError::Timeout(config.request_timeout)
            })??;

        let ctx = Arc::new(RewriteContext::new(self.config.clone(), incoming.proxy_origin(config)));
        rewrite_response(contained, ctx)
    }
}
