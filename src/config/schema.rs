//! Configuration schema definitions.
//!
//! This module defines the raw settings as read from a config file and the
//! environment. All types derive Serde traits for deserialization; every field
//! has a default so an empty file is a valid (if unusable) configuration.

use serde::{Deserialize, Serialize};

/// Root settings for the storefront proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxySettings {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream storefront definition.
    pub upstream: UpstreamSettings,

    /// Operator-facing origin settings.
    pub public: PublicSettings,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Which path a document route requests upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentPolicy {
    /// Request the real path; contain not-found states after the fact.
    #[default]
    Reactive,
    /// Always request the upstream root for document routes.
    AlwaysHome,
}

/// Upstream storefront settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Absolute base URL of the storefront (e.g. "https://store.printify.me").
    pub origin: Option<String>,

    /// Alternate storefront origin; wins over `origin` when set.
    pub override_origin: Option<String>,

    /// Extra upstream host names whose absolute URLs are rewritten too.
    pub aliases: Vec<String>,

    /// Maximum number of redirect hops followed server-side.
    pub max_redirect_hops: u32,

    /// Path rules recognized as the upstream's dead-end page.
    /// A trailing `*` makes the rule a prefix match.
    pub not_found_paths: Vec<String>,

    /// Upstream status codes treated as a not-found signal.
    pub not_found_statuses: Vec<u16>,

    /// Path policy for document routes.
    pub document_policy: DocumentPolicy,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            origin: None,
            override_origin: None,
            aliases: Vec::new(),
            max_redirect_hops: 6,
            not_found_paths: vec!["/page-not-found".to_string(), "/404".to_string()],
            not_found_statuses: vec![404],
            document_policy: DocumentPolicy::Reactive,
        }
    }
}

/// Settings for the origin end users see.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublicSettings {
    /// Fixed proxy origin. When unset it is derived per request from the
    /// Host header.
    pub origin: Option<String>,

    /// Scheme assumed when deriving the origin and no `x-forwarded-proto`
    /// header is present.
    pub scheme: String,
}

impl Default for PublicSettings {
    fn default() -> Self {
        Self {
            origin: None,
            scheme: "https".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline in seconds for upstream response headers, also the idle gap
    /// allowed while a body streams.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body buffered for forwarding, in bytes.
    pub max_request_body: usize,

    /// Memory the HTML rewriter may use for buffering a single document,
    /// in bytes. Past it the rest of the body is forwarded unmodified.
    pub max_rewrite_memory: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body: 2 * 1024 * 1024, // 2MB
            max_rewrite_memory: 8 * 1024 * 1024, // 8MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
