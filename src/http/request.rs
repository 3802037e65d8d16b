//! Incoming request capture.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client sent none
//! - Snapshot method, path, query and headers of the client request
//! - Buffer bodies of body-carrying methods up to the configured limit
//! - Derive the proxy's public origin for URL rewriting
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Buffered bodies make 307/308 replays possible

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::ProxyConfig;
use crate::upstream::builder::carries_body;
use crate::upstream::{ProxyError, ProxyResult};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestUuid;

impl MakeRequestId for RequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// The parts of a client request the pipeline works from.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Host the client addressed, forwarded upstream as `X-Forwarded-Host`.
    /// Taken from `Host` or the request authority, never from a
    /// client-supplied forwarding header.
    pub origin_host: Option<String>,
}

impl IncomingRequest {
    /// Capture a request, buffering its body when the method carries one.
    pub async fn from_request(request: Request<Body>, max_body: usize) -> ProxyResult<Self> {
        let (parts, body) = request.into_parts();

        let body = if carries_body(&parts.method) {
            let bytes = axum::body::to_bytes(body, max_body)
                .await
                .map_err(|e| ProxyError::RequestBody(e.to_string()))?;
            Some(bytes)
        } else {
            None
        };

        let origin_host = host_of(&parts.headers).or_else(|| parts.uri.authority().map(|a| a.to_string()));

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
            origin_host,
        })
    }

    /// Public origin of the proxy as seen by this client.
    ///
    /// A configured public origin wins. Otherwise the scheme comes from
    /// `X-Forwarded-Proto` (falling back to the configured scheme) and the
    /// host from `Host`. Empty when no host is known.
    pub fn proxy_origin(&self, config: &ProxyConfig) -> String {
        if let Some(origin) = &config.public_origin {
            return origin.clone();
        }

        let Some(host) = self.origin_host.as_deref() else {
            return String::new();
        };
        let scheme = self
            .headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| v == "http" || v == "https")
            .unwrap_or_else(|| config.public_scheme.clone());

        format!("{}://{}", scheme, host)
    }
}

fn host_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxySettings;

    fn config(public_origin: Option<&str>) -> ProxyConfig {
        let mut settings = ProxySettings::default();
        settings.upstream.origin = Some("https://store.printify.me".into());
        settings.public.origin = public_origin.map(str::to_string);
        ProxyConfig::from_settings(&settings).unwrap()
    }

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "shop.example")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_body_dropped() {
        let incoming = IncomingRequest::from_request(request(Method::GET, "/products?page=2", "ignored"), 1024)
            .await
            .unwrap();

        assert_eq!(incoming.path, "/products");
        assert_eq!(incoming.query.as_deref(), Some("page=2"));
        assert!(incoming.body.is_none());
        assert_eq!(incoming.origin_host.as_deref(), Some("shop.example"));
    }

    #[tokio::test]
    async fn test_post_body_buffered() {
        let incoming = IncomingRequest::from_request(request(Method::POST, "/cart/add", "id=7"), 1024)
            .await
            .unwrap();
        assert_eq!(incoming.body.as_deref(), Some(&b"id=7"[..]));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let result = IncomingRequest::from_request(request(Method::POST, "/cart/add", "0123456789"), 4).await;
        assert!(matches!(result, Err(ProxyError::RequestBody(_))));
    }

    #[tokio::test]
    async fn test_proxy_origin() {
        let mut incoming = IncomingRequest::from_request(request(Method::GET, "/", ""), 0).await.unwrap();

        assert_eq!(incoming.proxy_origin(&config(None)), "https://shop.example");
        assert_eq!(incoming.proxy_origin(&config(Some("https://www.shop.example"))), "https://www.shop.example");

        incoming.headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
        assert_eq!(incoming.proxy_origin(&config(None)), "http://shop.example");

        incoming.origin_host = None;
        assert_eq!(incoming.proxy_origin(&config(None)), "");
    }

    #[tokio::test]
    async fn test_forwarded_host_from_client_ignored() {
        let mut req = request(Method::GET, "/", "");
        req.headers_mut().insert("x-forwarded-host", HeaderValue::from_static("evil.example"));

        let incoming = IncomingRequest::from_request(req, 0).await.unwrap();

        assert_eq!(incoming.origin_host.as_deref(), Some("shop.example"));
        assert_eq!(incoming.proxy_origin(&config(None)), "https://shop.example");
    }

    #[tokio::test]
    async fn test_authority_used_without_host_header() {
        let req = Request::builder()
            .uri("http://shop.example:8080/products")
            .header("x-forwarded-host", "evil.example")
            .body(Body::empty())
            .unwrap();

        let incoming = IncomingRequest::from_request(req, 0).await.unwrap();

        assert_eq!(incoming.origin_host.as_deref(), Some("shop.example:8080"));
    }
}
