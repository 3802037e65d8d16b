//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (strip Host and hop-by-hop, add X-Forwarded-Host)
//!     → Pass to upstream
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//!     → Pass to rewriting
//! ```
//!
//! # Design Decisions
//! - No trust in client-supplied forwarding headers

pub mod headers;
