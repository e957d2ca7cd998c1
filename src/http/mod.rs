//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, limits, tracing)
//!     → middleware.rs (fresh nonce, CSP on documents)
//!     → pages.rs (shells with nonce-bearing inline script and style)
//!     → hardening headers on every response
//! ```

pub mod middleware;
pub mod pages;
pub mod server;

pub use middleware::{csp_applies, CspNonce};
pub use server::HttpServer;
