//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! IncomingRequest + RouteKind
//!     → builder.rs (target URL, sanitized headers, body policy)
//!     → redirect.rs (issue request, follow upstream redirects server-side)
//!         → client.rs (one request per hop, redirects disabled)
//!     → guard.rs (not-found page on a document route → upstream root)
//!     → UpstreamResponse (status, headers, streaming body)
//! ```
//!
//! # Design Decisions
//! - At most `max_redirect_hops + 2` sequential upstream calls per request
//! - The client never observes an intermediate upstream redirect
//! - Transport errors propagate to the error boundary unretried

pub mod builder;
pub mod client;
pub mod error;
pub mod guard;
pub mod redirect;

pub use client::{HttpUpstream, Upstream, UpstreamResponse, UpstreamTarget};
pub use error::{ProxyError, ProxyResult};
