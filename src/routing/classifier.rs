//! Route classification.
//!
//! # Responsibilities
//! - Decide whether a request path names a static asset or a document
//!
//! # Design Decisions
//! - Pure function of path shape: a final segment ending in a dot followed
//!   by 2 to 8 ASCII alphanumerics is an asset
//! - Query strings are ignored if the caller passes one along

use std::fmt;

/// Kind of route, derived from the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// A static file; always served from its literal path.
    Asset,
    /// An HTML page; subject to not-found containment.
    Document,
}

impl RouteKind {
    pub fn is_document(self) -> bool {
        self == RouteKind::Document
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteKind::Asset => "asset",
            RouteKind::Document => "document",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a request path.
pub fn classify(path: &str) -> RouteKind {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    let segment = path.rsplit('/').next().unwrap_or("");

    let Some((_, suffix)) = segment.rsplit_once('.') else {
        return RouteKind::Document;
    };

    if (2..=8).contains(&suffix.len()) && suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
        RouteKind::Asset
    } else {
        RouteKind::Document
    }
}
