//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the counter gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Remote authority (backend) settings.
    pub backend: BackendConfig,

    /// Per-action rate limiting buckets.
    pub rate_limit: RateLimitConfig,

    /// Response hardening and request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator session persistence (console only).
    pub session: SessionConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Remote authority configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend (e.g., "https://xyz.supabase.co").
    /// Empty means unset: origin derivation is disabled and remote calls fail.
    pub base_url: String,

    /// Public (anon) API key sent with every RPC.
    pub anon_key: String,

    /// Name of the credential-validation procedure.
    pub login_rpc: String,

    /// Name of the verify-and-consume procedure.
    pub verify_rpc: String,

    /// Transport timeout for a single RPC in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            anon_key: String::new(),
            login_rpc: "rpc_counter_validate".to_string(),
            verify_rpc: "rpc_verify_and_consume_code_v3".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl BackendConfig {
    /// The configured base URL, or `None` when unset.
    pub fn base_url(&self) -> Option<&str> {
        let trimmed = self.base_url.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// A single token bucket definition.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct BucketConfig {
    /// Tokens restored on every full refill interval.
    pub capacity: u32,

    /// Refill interval in milliseconds.
    pub refill_interval_ms: u64,
}

impl BucketConfig {
    pub const LOGIN: Self = Self {
        capacity: 10,
        refill_interval_ms: 60_000,
    };

    pub const VERIFY_CODE: Self = Self {
        capacity: 30,
        refill_interval_ms: 60_000,
    };
}

/// A bucket table as written; unset fields fall back to that bucket's default.
#[derive(Deserialize)]
struct PartialBucket {
    capacity: Option<u32>,
    refill_interval_ms: Option<u64>,
}

impl PartialBucket {
    fn or(self, fallback: BucketConfig) -> BucketConfig {
        BucketConfig {
            capacity: self.capacity.unwrap_or(fallback.capacity),
            refill_interval_ms: self.refill_interval_ms.unwrap_or(fallback.refill_interval_ms),
        }
    }
}

fn login_bucket<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BucketConfig, D::Error> {
    PartialBucket::deserialize(deserializer).map(|b| b.or(BucketConfig::LOGIN))
}

fn verify_code_bucket<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BucketConfig, D::Error> {
    PartialBucket::deserialize(deserializer).map(|b| b.or(BucketConfig::VERIFY_CODE))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting. When false every attempt is permitted.
    pub enabled: bool,

    /// Bucket guarding operator login attempts.
    #[serde(deserialize_with = "login_bucket")]
    pub login: BucketConfig,

    /// Bucket guarding access-code verification attempts.
    #[serde(deserialize_with = "verify_code_bucket")]
    pub verify_code: BucketConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            login: BucketConfig::LOGIN,
            verify_code: BucketConfig::VERIFY_CODE,
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Attach CSP and hardening headers.
    pub enable_headers: bool,

    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 64 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Operator session persistence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// JSON file holding the console's page-scoped state.
    pub state_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_path: ".counter-session.json".to_string(),
        }
    }
}
