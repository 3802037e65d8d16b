//! Response rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamResponse (final, after redirects and not-found containment)
//!     → headers.rs (Location, Set-Cookie, textual origin references)
//!     → html.rs (streaming attribute rewrite, HTML only)
//!     → axum Response
//! ```
//!
//! # Design Decisions
//! - Non-HTML bodies are forwarded byte-for-byte
//! - Redirect responses that reach this point are never body-rewritten

pub mod context;
pub mod headers;
pub mod html;

use std::sync::Arc;

use axum::response::Response;

use crate::upstream::{ProxyResult, UpstreamResponse};

pub use context::RewriteContext;

/// Turn the final upstream response into the client response.
pub fn rewrite_response(upstream: UpstreamResponse, ctx: Arc<RewriteContext>) -> ProxyResult<Response> {
    let html = !upstream.is_redirect() && upstream.is_html();
    let UpstreamResponse {
        status,
        mut headers,
        body,
    } = upstream;

    headers::rewrite_headers(&mut headers, &ctx, html);

    let body = if html {
        html::rewrite_html_body(body, ctx)
    } else {
        body
    };

    let mut response = Response::builder().status(status).body(body)?;
    *response.headers_mut() = headers;
    Ok(response)
}
