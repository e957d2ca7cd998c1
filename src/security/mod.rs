//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Operator action (login / verify):
//!     → rate_limit.rs (per-key token bucket, persisted)
//!     → gate workflow
//!
//! Incoming page request:
//!     → nonce.rs (fresh random nonce)
//!     → headers.rs (CSP bound to the nonce, hardening headers)
//!     → http middleware attaches both
//! ```
//!
//! # Design Decisions
//! - Fail closed on malformed input; degrade open only when limiter storage
//!   is unavailable
//! - No policy state is shared between requests

pub mod headers;
pub mod nonce;
pub mod rate_limit;

pub use headers::{BackendOrigins, ContentSecurityPolicy, SecurityHeaderBuilder, SecurityPolicy};
pub use nonce::{Nonce, NonceError};
pub use rate_limit::{BucketState, Clock, ManualClock, RateLimiter, SystemClock};
