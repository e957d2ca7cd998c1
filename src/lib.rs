//! Counter gate: operator sign-in and single-use access-code verification
//! against a remote authority, with per-request CSP for the served pages.

pub mod config;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod remote;
pub mod security;
pub mod storage;

pub use config::schema::GateConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
