//! Remote call failures and their operator-facing diagnostics.

use thiserror::Error;

/// Undefined function, usually a missing extension such as pgcrypto.
const CODE_UNDEFINED_FUNCTION: &str = "42883";
/// Insufficient privilege, usually a missing `GRANT EXECUTE`.
const CODE_INSUFFICIENT_PRIVILEGE: &str = "42501";
const CODE_SINGULAR_ROW: &str = "PGRST116";
const CODE_FUNCTION_NOT_FOUND: &str = "PGRST202";

/// Which remote action failed, for message selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    Login,
    Verify,
}

/// Errors from a remote procedure call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No backend base URL configured.
    #[error("backend URL is not configured")]
    NotConfigured,

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with an error.
    #[error("remote error (status {status}, code {}): {message}", .code.as_deref().unwrap_or("none"))]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The backend answered with a body of the wrong shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Classification of a failure for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    /// The procedure exists but depends on something the database lacks.
    MissingDependency,
    /// The procedure is missing or the caller may not execute it.
    MissingProcedureOrGrant,
    /// Anything else; retrying may help.
    Generic,
}

impl RemoteError {
    pub fn diagnosis(&self) -> Diagnosis {
        match self {
            Self::Remote {
                status,
                code,
                message,
            } => match code.as_deref() {
                Some(CODE_UNDEFINED_FUNCTION) => Diagnosis::MissingDependency,
                Some(CODE_SINGULAR_ROW | CODE_FUNCTION_NOT_FOUND | CODE_INSUFFICIENT_PRIVILEGE) => {
                    Diagnosis::MissingProcedureOrGrant
                }
                _ if *status == 404 || message.contains("404") => {
                    Diagnosis::MissingProcedureOrGrant
                }
                _ => Diagnosis::Generic,
            },
            Self::NotConfigured | Self::Transport(_) | Self::Decode(_) => Diagnosis::Generic,
        }
    }

    /// Message shown to the operator.
    pub fn user_message(&self, action: RemoteAction) -> &'static str {
        match (self.diagnosis(), action) {
            (Diagnosis::MissingDependency, RemoteAction::Login) => {
                "Backend is missing pgcrypto/citext or the login procedure is misdefined (crypt() unavailable)."
            }
            (Diagnosis::MissingDependency, RemoteAction::Verify) => {
                "Verification procedure is missing or pgcrypto/citext is not installed. Check the function definitions."
            }
            (Diagnosis::MissingProcedureOrGrant, _) => {
                "Procedure not found or not permitted (GRANT EXECUTE)."
            }
            (Diagnosis::Generic, _)
                if matches!(self, Self::NotConfigured | Self::Transport(_) | Self::Decode(_)) =>
            {
                "Unexpected error. Please try again."
            }
            (Diagnosis::Generic, RemoteAction::Login) => "Error validating credentials. Please try again.",
            (Diagnosis::Generic, RemoteAction::Verify) => "Error verifying the code. Please try again.",
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
