//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Serve on a listener until shutdown is signalled
//! - Answer with a fixed 500 when started without a usable configuration

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ProxyConfig, ProxySettings, ValidationError};
use crate::http::pipeline::Pipeline;
use crate::http::request::{request_id, RequestUuid, X_REQUEST_ID};
use crate::http::response;
use crate::upstream::{HttpUpstream, Upstream};

/// Application state injected into the handler.
#[derive(Clone)]
pub enum AppState {
    Ready(Pipeline),
    /// No usable configuration; every request gets this message as a 500.
    Misconfigured(Arc<str>),
}

/// HTTP server for the storefront proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server from raw settings.
    ///
    /// Invalid settings do not prevent startup; the server then answers
    /// every request with a 500 describing the problem.
    pub fn new(settings: &ProxySettings) -> Self {
        let state = match ProxyConfig::from_settings(settings) {
            Ok(config) => match HttpUpstream::new(&config) {
                Ok(upstream) => AppState::Ready(Pipeline::new(Arc::new(config), Arc::new(upstream))),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build upstream client");
                    AppState::Misconfigured(e.to_string().into())
                }
            },
            Err(errors) => {
                for error in &errors {
                    tracing::error!(error = %error, "Invalid configuration");
                }
                AppState::Misconfigured(describe(&errors).into())
            }
        };

        Self {
            router: Self::build_router(state),
        }
    }

    /// Create a server around an already validated config and transport.
    pub fn with_upstream(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Self {
        let state = AppState::Ready(Pipeline::new(Arc::new(config), upstream));
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Upstream deadlines live in the pipeline and the transport, so a slow
    /// storefront surfaces as a 502 and a long streamed body is never cut.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, RequestUuid))
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state {
        AppState::Ready(pipeline) => pipeline.handle(request).await,
        AppState::Misconfigured(message) => response::config_error(&message),
    }
}
