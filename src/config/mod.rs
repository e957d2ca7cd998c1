//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → shared with the server and the operator console
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - A missing or malformed backend URL degrades origin derivation instead of
//!   failing startup

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{config_from_env, load_config, ConfigError};
pub use schema::{
    BackendConfig, BucketConfig, GateConfig, ListenerConfig, ObservabilityConfig,
    RateLimitConfig, SecurityConfig, SessionConfig,
};
