//! Upstream transport.
//!
//! # Responsibilities
//! - Define the request/response values exchanged with the upstream
//! - Issue a single request with redirects disabled
//! - Expose the response body as a stream, never buffered
//!
//! # Design Decisions
//! - Transport is a trait so the pipeline can be driven without a network
//! - Connect and read-idle timeouts and connection pooling belong to the
//!   transport; the time-to-headers deadline is enforced by the pipeline
//! - Content decoding (gzip/br/deflate) happens here so HTML can be rewritten

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, StatusCode};
use url::Url;

use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::security::headers::strip_hop_by_hop;
use crate::upstream::error::{ProxyError, ProxyResult};

/// One upstream request. A fresh value is built for every hop.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl UpstreamTarget {
    /// Target for the next hop after a redirect with `status` to `url`.
    ///
    /// 303 always becomes GET, and 301/302 turn POST into GET. 307/308
    /// replay the method and buffered body. HEAD stays HEAD.
    pub fn follow(&self, url: Url, status: StatusCode) -> Self {
        let downgrade = self.method != Method::HEAD
            && (status == StatusCode::SEE_OTHER
                || (self.method == Method::POST
                    && matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND)));

        if downgrade {
            Self::bodiless(Method::GET, url, &self.headers)
        } else {
            Self {
                method: self.method.clone(),
                url,
                headers: self.headers.clone(),
                body: self.body.clone(),
            }
        }
    }

    /// Target for the upstream root, carrying this request's headers.
    pub fn to_root(&self, config: &ProxyConfig) -> Self {
        let method = if self.method == Method::HEAD {
            Method::HEAD
        } else {
            Method::GET
        };
        Self::bodiless(method, config.upstream_root(), &self.headers)
    }

    fn bodiless(method: Method, url: Url, headers: &HeaderMap) -> Self {
        let mut headers = headers.clone();
        headers.remove(header::CONTENT_TYPE);
        headers.remove(header::CONTENT_LENGTH);
        Self {
            method,
            url,
            headers,
            body: None,
        }
    }
}

/// Response received from the upstream.
///
/// The body is a one-shot stream; whoever reads it last owns it.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl UpstreamResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn is_html(&self) -> bool {
        self.content_type().to_ascii_lowercase().contains("text/html")
    }

    /// True for the 301–308 range, except 304 which is a cache answer.
    pub fn is_redirect(&self) -> bool {
        is_redirect_status(self.status)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
    }
}

pub fn is_redirect_status(status: StatusCode) -> bool {
    (301..=308).contains(&status.as_u16()) && status != StatusCode::NOT_MODIFIED
}

/// Something that can deliver a request to the upstream origin.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Issue exactly one request. Redirects must not be followed.
    async fn send(&self, target: UpstreamTarget) -> ProxyResult<UpstreamResponse>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(config: &ProxyConfig) -> ProxyResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .connect_timeout(config.connect_timeout)
            // Idle gaps only; a total timeout would cut long streamed bodies.
            .read_timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, target: UpstreamTarget) -> ProxyResult<UpstreamResponse> {
        tracing::debug!(method = %target.method, path = %target.url.path(), "Upstream request");

        let mut request = self
            .client
            .request(target.method, target.url)
            .headers(target.headers);
        if let Some(body) = target.body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            metrics::record_upstream_error();
            ProxyError::from(e)
        })?;

        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        Ok(UpstreamResponse {
            status,
            headers,
            body: Body::from_stream(response.bytes_stream()),
        })
    }
}
