//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides)
//!     → validation.rs (semantic checks, URL resolution)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all stages
//! ```
//!
//! # Design Decisions
//! - Config is resolved once per process; no stage reads the environment
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, ConfigError};
pub use schema::{DocumentPolicy, ListenerConfig, ObservabilityConfig, ProxySettings};
pub use validation::{ProxyConfig, ValidationError};
