//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → classifier.rs (Asset or Document)
//!     → [request builder picks upstream path per policy]
//!
//! Upstream locations / rewritten links
//!     → matcher.rs (is this the upstream's not-found page?)
//! ```
//!
//! # Design Decisions
//! - Patterns compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same path always classifies the same way

pub mod classifier;
pub mod matcher;

pub use classifier::{classify, RouteKind};
pub use matcher::{NotFoundPatterns, PathRule};
