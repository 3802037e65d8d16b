//! Responses produced by the proxy itself rather than the upstream.
//!
//! # Responsibilities
//! - Map pipeline failures to a 502 with a short plain-text diagnostic
//! - Answer every request with a 500 while the configuration is unusable
//!
//! # Design Decisions
//! - Diagnostics never carry upstream URLs
//! - Bodies are plain text; these pages are not branded

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::upstream::ProxyError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

fn plain(status: StatusCode, body: String) -> Response {
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

/// 502 for a request the pipeline could not complete.
pub fn bad_gateway(err: &ProxyError) -> Response {
    plain(StatusCode::BAD_GATEWAY, format!("Bad gateway: {}", err))
}

/// 500 for a proxy started without a usable configuration.
pub fn config_error(message: &str) -> Response {
    plain(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::body_string;

    #[tokio::test]
    async fn test_bad_gateway_body() {
        let response = bad_gateway(&ProxyError::Transport("connection refused".into()));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()[header::CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(
            body_string(response.into_body()).await,
            "Bad gateway: upstream request failed: connection refused"
        );
    }

    #[tokio::test]
    async fn test_config_error_body() {
        let response = config_error("Missing PRINTIFY_STORE_URL or USD_STORE_URL");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response.into_body()).await,
            "Missing PRINTIFY_STORE_URL or USD_STORE_URL"
        );
    }
}
