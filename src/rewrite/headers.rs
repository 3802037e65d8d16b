//! Response header rewriting.
//!
//! # Responsibilities
//! - Point `Location` at the proxy origin (or its root for not-found pages)
//! - Drop cookie `Domain` attributes naming the upstream
//! - Replace textual upstream references in every other header
//! - Normalize HTML content headers after the body is rewritten

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::rewrite::context::RewriteContext;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Rewrite response headers in place.
pub fn rewrite_headers(headers: &mut HeaderMap, ctx: &RewriteContext, html: bool) {
    let names: Vec<HeaderName> = headers.keys().cloned().collect();

    for name in names {
        let mut changed = false;
        let mut values = Vec::new();

        for value in headers.get_all(&name) {
            let rewritten = value
                .to_str()
                .ok()
                .and_then(|v| rewrite_value(&name, v, ctx))
                .and_then(|v| HeaderValue::from_str(&v).ok());
            match rewritten {
                Some(new) => {
                    changed = true;
                    values.push(new);
                }
                None => values.push(value.clone()),
            }
        }

        if changed {
            headers.remove(&name);
            for value in values {
                headers.append(name.clone(), value);
            }
        }
    }

    if html {
        headers.remove(header::CONTENT_LENGTH);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    }
}

fn rewrite_value(name: &HeaderName, value: &str, ctx: &RewriteContext) -> Option<String> {
    if *name == header::LOCATION {
        ctx.rewrite_location(value)
    } else if *name == header::SET_COOKIE {
        strip_cookie_domain(value, ctx)
    } else {
        ctx.replace_upstream_refs(value)
    }
}

/// Remove a `Domain=` attribute naming an upstream host so the cookie binds
/// to the proxy host.
fn strip_cookie_domain(cookie: &str, ctx: &RewriteContext) -> Option<String> {
    let mut stripped = false;
    let kept: Vec<&str> = cookie
        .split(';')
        .filter(|attr| {
            let names_upstream = attr
                .split_once('=')
                .filter(|(k, _)| k.trim().eq_ignore_ascii_case("domain"))
                .is_some_and(|(_, v)| ctx.covers_upstream_host(v));
            stripped |= names_upstream;
            !names_upstream
        })
        .collect();

    stripped.then(|| kept.join(";"))
}
