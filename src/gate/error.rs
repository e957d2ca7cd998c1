//! Failure taxonomy for operator actions.

use thiserror::Error;

use crate::gate::outcome::VerificationOutcome;
use crate::remote::{RemoteAction, RemoteError};

/// Which input failed its shape check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Code,
    Email,
    Password,
}

impl std::fmt::Display for InputField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Code => "code",
            Self::Email => "email",
            Self::Password => "password",
        })
    }
}

/// Why an operator action did not succeed.
///
/// None of these trigger an automatic retry; every retry is a new explicit
/// operator action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// No operator identity at submit time.
    #[error("session expired")]
    ExpiredSession,

    /// The local limiter refused the attempt. No remote call was made.
    #[error("too many attempts")]
    RateLimited,

    /// Input failed its shape check. No remote call was made.
    #[error("malformed {0}")]
    MalformedInput(InputField),

    /// The remote rejected the operator's credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The remote answered and denied the code.
    #[error("code rejected ({})", .0.reason.as_str())]
    RemoteRejected(Box<VerificationOutcome>),

    /// Transport failure or remote-side error.
    #[error("remote unavailable: {source}")]
    RemoteUnavailable {
        action: RemoteAction,
        source: RemoteError,
    },

    /// The session identity could not be persisted.
    #[error("session storage failed: {0}")]
    SessionStorage(String),
}

impl GateError {
    pub fn remote(action: RemoteAction, source: RemoteError) -> Self {
        Self::RemoteUnavailable { action, source }
    }

    /// Message shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::ExpiredSession => "Session expired. Please sign in again.".to_string(),
            Self::RateLimited => "Too many attempts. Wait a minute and try again.".to_string(),
            Self::MalformedInput(InputField::Code) => "Invalid code.".to_string(),
            Self::MalformedInput(InputField::Email) => "Invalid email.".to_string(),
            Self::MalformedInput(InputField::Password) => {
                "Invalid password (minimum 8 characters).".to_string()
            }
            Self::InvalidCredentials => "Incorrect credentials.".to_string(),
            Self::RemoteRejected(outcome) => outcome.headline(),
            Self::RemoteUnavailable { action, source } => source.user_message(*action).to_string(),
            Self::SessionStorage(_) => "Could not store the session. Please try again.".to_string(),
        }
    }

    /// Label for metrics and logs.
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::ExpiredSession => "expired_session",
            Self::RateLimited => "rate_limited",
            Self::MalformedInput(_) => "malformed",
            Self::InvalidCredentials => "invalid_credentials",
            Self::RemoteRejected(outcome) => outcome.result_label(),
            Self::RemoteUnavailable { .. } => "remote_unavailable",
            Self::SessionStorage(_) => "session_storage",
        }
    }
}
