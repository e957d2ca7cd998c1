//! Operator-facing gate logic.
//!
//! # Data Flow
//! ```text
//! Login:
//!     login.rs → credentials.rs (shape) → RemoteAuthority → session.rs
//!
//! Verify:
//!     workflow.rs
//!         → session.rs (who is asking)
//!         → RateLimiter (verify-code bucket)
//!         → code.rs (grammar)
//!         → RemoteAuthority (verify and consume)
//!         → outcome.rs (normalize row shapes)
//!         → terminal phase, locked until reset
//! ```
//!
//! # Design Decisions
//! - Every guard runs locally before the remote is contacted
//! - Remote result shapes are tolerated, never trusted
//! - The workflow owns its phase; callers only observe it

pub mod code;
pub mod credentials;
pub mod error;
pub mod login;
pub mod outcome;
pub mod session;
pub mod workflow;

pub use code::{filter_input, validate, AccessCode, Malformed};
pub use error::{GateError, InputField};
pub use login::{LoginOutcome, LoginWorkflow};
pub use outcome::{
    normalize_row, normalize_rows, InvitationKind, RawVerificationRow, ReasonCode, Subject,
    VerificationOutcome,
};
pub use session::{SessionIdentity, SessionStore};
pub use workflow::{PendingCheck, Phase, VerificationWorkflow};
