//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional, $GATEWAY_CONFIG)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (OMIE_API_URL, OMIE_APP_KEY, OMIE_APP_SECRET, ...)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to subsystems at construction time
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults except upstream credentials
//! - Missing credentials are a startup failure, never a per-request one
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    GatewayConfig, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RateLimitConfig, UpstreamConfig,
};
pub use validation::{validate_config, ConfigIssue};
