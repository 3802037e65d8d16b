//! Error definitions for the proxy pipeline.

use std::time::Duration;

use thiserror::Error;

/// Errors that abort a proxied request. All of them end in a 502 at the
/// error boundary.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Network failure or unreadable response while contacting upstream.
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// The upstream sent no response headers within the request deadline.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// The client's request body could not be read.
    #[error("failed to read request body: {0}")]
    RequestBody(String),

    /// The outgoing response could not be assembled.
    #[error("failed to build response: {0}")]
    Build(#[from] axum::http::Error),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        // Never let the upstream URL leak into a client-visible message.
        ProxyError::Transport(err.without_url().to_string())
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
