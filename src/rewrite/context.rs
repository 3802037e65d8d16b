//! URL mapping from the upstream origin to the proxy origin.

use std::sync::Arc;

use url::{Position, Url};

use crate::config::ProxyConfig;

/// Everything the rewriting pass needs to know. Built once per response and
/// never mutated while rewriting.
///
/// Upstream matching is delegated to the shared [`ProxyConfig`] so headers,
/// HTML and redirect resolution agree on what counts as the upstream.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    /// Proxy origin without trailing slash, e.g. `https://shop.example`.
    /// Empty when the public host is unknown; rewritten URLs are then
    /// root-relative.
    pub proxy_origin: String,
    proxy_host: Option<String>,
    config: Arc<ProxyConfig>,
    /// `//host[:port]` needles for textual replacement.
    needles: Vec<String>,
}

impl RewriteContext {
    pub fn new(config: Arc<ProxyConfig>, proxy_origin: String) -> Self {
        let proxy_host = Url::parse(&proxy_origin)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase));

        let port_suffix = config
            .upstream_origin
            .port()
            .map(|p| format!(":{}", p))
            .unwrap_or_default();
        let needles = config
            .upstream_hosts
            .iter()
            .map(|host| format!("//{}{}", host, port_suffix))
            .collect();

        Self {
            proxy_origin,
            proxy_host,
            config,
            needles,
        }
    }

    /// Memory budget for rewriting one HTML document.
    pub fn max_rewrite_memory(&self) -> usize {
        self.config.max_rewrite_memory
    }

    /// The proxy root as an absolute URL when the origin is known.
    pub fn proxy_root(&self) -> String {
        format!("{}/", self.proxy_origin)
    }

    fn is_proxy(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && match (&self.proxy_host, url.host_str()) {
                (Some(proxy), Some(host)) => proxy.eq_ignore_ascii_case(host),
                _ => false,
            }
    }

    /// True if `domain` is an upstream host or a parent domain of one.
    pub fn covers_upstream_host(&self, domain: &str) -> bool {
        let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
        !domain.is_empty()
            && self
                .config
                .upstream_hosts
                .iter()
                .any(|h| *h == domain || h.ends_with(&format!(".{}", domain)))
    }

    /// Map an upstream URL onto the proxy origin, path/query/fragment kept.
    fn to_proxy(&self, url: &Url) -> String {
        format!("{}{}", self.proxy_origin, &url[Position::BeforePath..])
    }

    /// Rewrite a link-like attribute value.
    ///
    /// Absolute upstream URLs move to the proxy origin. With `clamp`, any
    /// same-site link to a not-found page becomes `/`. Returns `None` when
    /// the value should stay as it is.
    pub fn rewrite_link(&self, value: &str, clamp: bool) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }

        let absolute = if trimmed.starts_with("//") {
            Url::parse(&format!("{}:{}", self.config.upstream_origin.scheme(), trimmed)).ok()
        } else {
            match Url::parse(trimmed) {
                Ok(url) => Some(url),
                Err(url::ParseError::RelativeUrlWithoutBase) => None,
                Err(_) => return None,
            }
        };

        match absolute {
            Some(url) if self.config.is_upstream_url(&url) => {
                if clamp && self.config.not_found_patterns.matches(url.path()) {
                    Some("/".to_string())
                } else {
                    Some(self.to_proxy(&url))
                }
            }
            Some(url) if clamp && self.is_proxy(&url) && self.config.not_found_patterns.matches(url.path()) => {
                Some("/".to_string())
            }
            Some(_) => None,
            None if clamp => {
                let url = self.config.upstream_origin.join(trimmed).ok()?;
                (self.config.not_found_patterns.matches(url.path()) && trimmed != "/").then(|| "/".to_string())
            }
            None => None,
        }
    }

    /// Rewrite a `Location` header value.
    ///
    /// Resolved against the upstream origin. Not-found targets go to the
    /// proxy root; other upstream or proxy targets keep path and query on the
    /// proxy origin; foreign targets are left alone.
    pub fn rewrite_location(&self, value: &str) -> Option<String> {
        let url = self.config.upstream_origin.join(value.trim()).ok()?;
        if !self.config.is_upstream_url(&url) && !self.is_proxy(&url) {
            return None;
        }
        let rewritten = if self.config.not_found_patterns.matches(url.path()) {
            self.proxy_root()
        } else {
            self.to_proxy(&url)
        };
        (rewritten != value).then_some(rewritten)
    }

    /// Replace every textual reference to the upstream origin
    /// (`https://host`, `http://host`, `//host`) with the proxy origin.
    pub fn replace_upstream_refs(&self, text: &str) -> Option<String> {
        let lower = text.to_ascii_lowercase();
        let bytes = lower.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut from = 0;

        while let Some((start, end)) = self.next_needle(&lower, from) {
            from = start + 1;

            let at_boundary = bytes
                .get(end)
                .map_or(true, |b| !(b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':')));
            if !at_boundary {
                continue;
            }

            let before = &lower[..start];
            let replace_from = if before.ends_with("https:") {
                start - 6
            } else if before.ends_with("http:") {
                start - 5
            } else if before.ends_with(|c: char| c.is_ascii_alphanumeric() || c == ':' || c == '/') {
                // Some other scheme, or part of a longer path.
                continue;
            } else {
                start
            };

            out.push_str(&text[copied..replace_from]);
            out.push_str(&self.proxy_origin);
            if self.proxy_origin.is_empty() && bytes.get(end) != Some(&b'/') {
                out.push('/');
            }
            copied = end;
            from = end;
        }

        if copied == 0 {
            return None;
        }
        out.push_str(&text[copied..]);
        Some(out)
    }

    fn next_needle(&self, lower: &str, from: usize) -> Option<(usize, usize)> {
        self.needles
            .iter()
            .filter_map(|n| lower[from..].find(n.as_str()).map(|i| (from + i, from + i + n.len())))
            .min_by_key(|(start, _)| *start)
    }
}
