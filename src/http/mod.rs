//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all route)
//!     → request.rs (request ID, request capture, proxy origin)
//!     → pipeline.rs (routing → upstream → rewrite; error boundary)
//!     → response.rs (proxy-generated 500/502 pages)
//!     → Send to client
//! ```

pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use pipeline::Pipeline;
pub use request::{IncomingRequest, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
