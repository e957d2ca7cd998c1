//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated secrets
//! - Request ID flows through HTTP spans; attempt ID through workflow spans
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
