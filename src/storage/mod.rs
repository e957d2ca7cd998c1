//! Page-scoped key/value storage.
//!
//! # Data Flow
//! ```text
//! RateLimiter ──┐
//!               ├─→ KeyValueStore (get / set / remove)
//! SessionStore ─┘        ├─ memory.rs (in-process, tests and server)
//!                        └─ file.rs   (JSON file, operator console)
//! ```
//!
//! # Design Decisions
//! - The capability is deliberately minimal so components can be tested
//!   against an in-memory fake
//! - Values are opaque strings; callers own their serialization
//! - Last writer wins: two processes sharing one file are not coordinated

pub mod file;
pub mod memory;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be read or written.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing medium holds data that is not a key/value map.
    #[error("storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Minimal key/value capability standing in for browser session storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
