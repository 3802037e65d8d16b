//! Transparent reverse proxy for a hosted storefront.
//!
//! Serves the upstream store under the operator's own domain: upstream
//! redirects are followed server-side, the store's dead-end pages are
//! replaced by its home page, and upstream URLs in headers and HTML are
//! rewritten to the proxy origin.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod routing;
pub mod security;
pub mod upstream;

#[cfg(test)]
mod testing;

pub use config::{ProxyConfig, ProxySettings};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
