//! Remote authority integration.
//!
//! # Data Flow
//! ```text
//! LoginWorkflow / VerificationWorkflow
//!     → RemoteAuthority (trait, mockable)
//!     → client.rs (PostgREST RPC over reqwest)
//!     → raw JSON rows → gate::outcome
//! ```
//!
//! # Design Decisions
//! - Calls are never retried; a failure is reported and the operator decides
//! - Remote-side configuration errors get a specific diagnostic
//! - Secrets stay in `SecretString` and are never logged

pub mod client;
pub mod error;

use std::future::Future;

use secrecy::SecretString;

use crate::gate::code::AccessCode;
use crate::gate::outcome::RawVerificationRow;

pub use client::PostgrestClient;
pub use error::{Diagnosis, RemoteAction, RemoteError};

/// The remote procedures this gate consults.
pub trait RemoteAuthority: Send + Sync {
    /// Check operator credentials. Only an explicit `true` means valid.
    fn validate_credentials(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<bool, RemoteError>> + Send;

    /// Check and atomically consume an access code. Zero or one row.
    fn verify_code(
        &self,
        code: &AccessCode,
        operator_email: &str,
    ) -> impl Future<Output = Result<Vec<RawVerificationRow>, RemoteError>> + Send;
}
