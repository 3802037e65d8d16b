//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Resolve the upstream origin and the operator origin into URLs
//! - Compile not-found path rules
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxySettings → Result<ProxyConfig, Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::schema::{DocumentPolicy, ProxySettings};
use crate::routing::{NotFoundPatterns, PathRule};

/// A single semantic problem in the settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing PRINTIFY_STORE_URL or USD_STORE_URL")]
    MissingUpstream,

    #[error("invalid upstream origin '{0}': must be an absolute http(s) URL")]
    InvalidUpstream(String),

    #[error("invalid public origin '{0}': must be an absolute http(s) URL")]
    InvalidPublicOrigin(String),

    #[error("invalid public scheme '{0}': expected http or https")]
    InvalidPublicScheme(String),

    #[error("max_redirect_hops must be at least 1")]
    ZeroRedirectHops,

    #[error("invalid not-found path rule '{0}': must start with '/'")]
    InvalidNotFoundPath(String),

    #[error("invalid not-found status {0}")]
    InvalidNotFoundStatus(u16),
}

/// Validated, immutable proxy configuration shared by every stage.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Upstream origin (scheme, host, port; path is always `/`).
    pub upstream_origin: Url,
    /// Lowercased host names treated as the upstream when rewriting.
    pub upstream_hosts: Vec<String>,
    pub not_found_patterns: NotFoundPatterns,
    pub not_found_statuses: Vec<StatusCode>,
    pub max_redirect_hops: u32,
    pub document_policy: DocumentPolicy,
    /// Fixed operator origin, serialized without trailing slash.
    pub public_origin: Option<String>,
    pub public_scheme: String,
    pub max_request_body: usize,
    pub max_rewrite_memory: usize,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ProxyConfig {
    /// Validate raw settings into a usable configuration.
    pub fn from_settings(settings: &ProxySettings) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let upstream = &settings.upstream;

        let raw_origin = upstream
            .override_origin
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| upstream.origin.as_deref().filter(|s| !s.trim().is_empty()));

        let upstream_origin = match raw_origin {
            None => {
                errors.push(ValidationError::MissingUpstream);
                None
            }
            Some(raw) => match parse_origin(raw) {
                Some(url) => Some(url),
                None => {
                    errors.push(ValidationError::InvalidUpstream(raw.to_string()));
                    None
                }
            },
        };

        let public_origin = match settings.public.origin.as_deref().filter(|s| !s.trim().is_empty()) {
            None => None,
            Some(raw) => match parse_origin(raw) {
                Some(url) => Some(origin_string(&url)),
                None => {
                    errors.push(ValidationError::InvalidPublicOrigin(raw.to_string()));
                    None
                }
            },
        };

        let public_scheme = settings.public.scheme.to_ascii_lowercase();
        if public_scheme != "http" && public_scheme != "https" {
            errors.push(ValidationError::InvalidPublicScheme(settings.public.scheme.clone()));
        }

        if upstream.max_redirect_hops == 0 {
            errors.push(ValidationError::ZeroRedirectHops);
        }

        let mut rules = Vec::with_capacity(upstream.not_found_paths.len());
        for raw in &upstream.not_found_paths {
            match PathRule::parse(raw) {
                Some(rule) => rules.push(rule),
                None => errors.push(ValidationError::InvalidNotFoundPath(raw.clone())),
            }
        }

        let mut not_found_statuses = Vec::with_capacity(upstream.not_found_statuses.len());
        for code in &upstream.not_found_statuses {
            match StatusCode::from_u16(*code) {
                Ok(status) if !status.is_informational() => not_found_statuses.push(status),
                _ => errors.push(ValidationError::InvalidNotFoundStatus(*code)),
            }
        }

        match upstream_origin {
            Some(upstream_origin) if errors.is_empty() => {
                let mut upstream_hosts = vec![upstream_origin
                    .host_str()
                    .unwrap_or_default()
                    .to_ascii_lowercase()];
                for alias in &upstream.aliases {
                    let alias = alias.trim().to_ascii_lowercase();
                    if !alias.is_empty() && !upstream_hosts.contains(&alias) {
                        upstream_hosts.push(alias);
                    }
                }

                Ok(Self {
                    upstream_origin,
                    upstream_hosts,
                    not_found_patterns: NotFoundPatterns::new(rules),
                    not_found_statuses,
                    max_redirect_hops: upstream.max_redirect_hops,
                    document_policy: upstream.document_policy,
                    public_origin,
                    public_scheme,
                    max_request_body: settings.limits.max_request_body,
                    max_rewrite_memory: settings.limits.max_rewrite_memory,
                    connect_timeout: Duration::from_secs(settings.timeouts.connect_secs),
                    request_timeout: Duration::from_secs(settings.timeouts.request_secs),
                })
            }
            _ => Err(errors),
        }
    }

    /// The upstream root URL (`<origin>/`).
    pub fn upstream_root(&self) -> Url {
        self.upstream_origin.clone()
    }

    /// Returns true if `url` points at the upstream (or one of its aliases).
    ///
    /// http and https are treated alike; an explicit port must match the
    /// upstream's.
    pub fn is_upstream_url(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && url.port() == self.upstream_origin.port()
            && url
                .host_str()
                .is_some_and(|host| self.is_upstream_host(host))
    }

    /// Returns true if `host` is the upstream host or an alias.
    pub fn is_upstream_host(&self, host: &str) -> bool {
        self.upstream_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(host))
    }

    /// Returns true if `status` is a configured not-found signal.
    pub fn is_not_found_status(&self, status: StatusCode) -> bool {
        self.not_found_statuses.contains(&status)
    }
}

/// Parse an absolute http(s) URL and reduce it to its origin.
fn parse_origin(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}

/// Serialize a URL's origin without a trailing slash.
pub fn origin_string(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(origin: Option<&str>) -> ProxySettings {
        let mut settings = ProxySettings::default();
        settings.upstream.origin = origin.map(String::from);
        settings
    }

    #[test]
    fn test_valid_config() {
        let config = ProxyConfig::from_settings(&settings_with(Some("https://store.printify.me/shop?x=1"))).unwrap();
        assert_eq!(config.upstream_origin.as_str(), "https://store.printify.me/");
        assert_eq!(config.upstream_hosts, vec!["store.printify.me".to_string()]);
        assert_eq!(config.max_redirect_hops, 6);
        assert!(config.not_found_patterns.matches("/page-not-found"));
        assert!(config.is_not_found_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_override_wins() {
        let mut settings = settings_with(Some("https://store.printify.me"));
        settings.upstream.override_origin = Some("https://usd.printify.me".into());
        let config = ProxyConfig::from_settings(&settings).unwrap();
        assert_eq!(config.upstream_origin.host_str(), Some("usd.printify.me"));
    }

    #[test]
    fn test_missing_upstream() {
        let errors = ProxyConfig::from_settings(&settings_with(None)).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingUpstream]);
        assert_eq!(errors[0].to_string(), "Missing PRINTIFY_STORE_URL or USD_STORE_URL");
    }

    #[test]
    fn test_collects_all_errors() {
        let mut settings = settings_with(Some("ftp://store"));
        settings.upstream.max_redirect_hops = 0;
        settings.upstream.not_found_paths = vec!["oops".into()];
        settings.public.scheme = "gopher".into();
        let errors = ProxyConfig::from_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroRedirectHops));
        assert!(errors.contains(&ValidationError::InvalidUpstream("ftp://store".into())));
    }

    #[test]
    fn test_upstream_url_matching() {
        let config = ProxyConfig::from_settings(&settings_with(Some("https://store.printify.me"))).unwrap();
        assert!(config.is_upstream_url(&Url::parse("https://store.printify.me/a").unwrap()));
        assert!(config.is_upstream_url(&Url::parse("http://STORE.printify.me/a").unwrap()));
        assert!(!config.is_upstream_url(&Url::parse("https://store.printify.me:8443/a").unwrap()));
        assert!(!config.is_upstream_url(&Url::parse("https://other.example/a").unwrap()));
        assert!(!config.is_upstream_url(&Url::parse("ftp://store.printify.me/a").unwrap()));
    }

    #[test]
    fn test_public_origin_normalized() {
        let mut settings = settings_with(Some("https://store.printify.me"));
        settings.public.origin = Some("https://shop.example/".into());
        settings.upstream.aliases = vec!["CDN.Printify.me".into()];
        let config = ProxyConfig::from_settings(&settings).unwrap();
        assert_eq!(config.public_origin.as_deref(), Some("https://shop.example"));
        assert!(config.upstream_hosts.contains(&"cdn.printify.me".to_string()));
    }
}
