//! Operator login.
//!
//! Checks run in order: existing session, rate limiter, email shape, password
//! shape, remote credential check. Only a successful remote check writes the
//! session identity.

use std::sync::Arc;

use secrecy::SecretString;

use crate::gate::credentials::{validate_email, validate_password};
use crate::gate::error::{GateError, InputField};
use crate::gate::session::{SessionIdentity, SessionStore};
use crate::observability::metrics;
use crate::remote::{RemoteAction, RemoteAuthority};
use crate::security::RateLimiter;

/// Successful login results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A session already existed; nothing was checked.
    AlreadySignedIn(SessionIdentity),
    /// Credentials were accepted and the session was written.
    SignedIn(SessionIdentity),
}

impl LoginOutcome {
    pub fn identity(&self) -> &SessionIdentity {
        match self {
            Self::AlreadySignedIn(identity) | Self::SignedIn(identity) => identity,
        }
    }
}

/// Login screen logic.
pub struct LoginWorkflow<R> {
    remote: Arc<R>,
    limiter: RateLimiter,
    session: SessionStore,
}

impl<R: RemoteAuthority> LoginWorkflow<R> {
    pub fn new(remote: Arc<R>, limiter: RateLimiter, session: SessionStore) -> Self {
        Self {
            remote,
            limiter,
            session,
        }
    }

    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, GateError> {
        let result = self.attempt(email, password).await;
        let label = match &result {
            Ok(LoginOutcome::AlreadySignedIn(_)) => "already_signed_in",
            Ok(LoginOutcome::SignedIn(_)) => "signed_in",
            Err(e) => e.result_label(),
        };
        metrics::record_login(label);
        result
    }

    async fn attempt(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, GateError> {
        if let Some(identity) = self.session.current() {
            return Ok(LoginOutcome::AlreadySignedIn(identity));
        }

        if !self.limiter.try_consume(1) {
            return Err(GateError::RateLimited);
        }

        let email = validate_email(email).ok_or(GateError::MalformedInput(InputField::Email))?;
        if !validate_password(password) {
            return Err(GateError::MalformedInput(InputField::Password));
        }

        let valid = self
            .remote
            .validate_credentials(&email, password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Credential validation call failed");
                GateError::remote(RemoteAction::Login, e)
            })?;

        if !valid {
            tracing::info!(operator = %email, "Credentials rejected");
            return Err(GateError::InvalidCredentials);
        }

        let identity = self
            .session
            .establish(&email)
            .map_err(|e| GateError::SessionStorage(e.to_string()))?;
        Ok(LoginOutcome::SignedIn(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::code::AccessCode;
    use crate::gate::outcome::RawVerificationRow;
    use crate::remote::RemoteError;
    use crate::storage::MemoryStore;
    use secrecy::ExposeSecret;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts exactly one email/password pair.
    struct FixedCredentials {
        fail_with: Option<RemoteError>,
        calls: AtomicUsize,
    }

    impl RemoteAuthority for FixedCredentials {
        async fn validate_credentials(
            &self,
            email: &str,
            password: &SecretString,
        ) -> Result<bool, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            Ok(email == "ops@example.com" && password.expose_secret() == "correct-horse")
        }

        async fn verify_code(
            &self,
            _code: &AccessCode,
            _operator_email: &str,
        ) -> Result<Vec<RawVerificationRow>, RemoteError> {
            Ok(Vec::new())
        }
    }

    fn setup(fail_with: Option<RemoteError>) -> (LoginWorkflow<FixedCredentials>, Arc<FixedCredentials>, SessionStore) {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(FixedCredentials {
            fail_with,
            calls: AtomicUsize::new(0),
        });
        let session = SessionStore::new(store.clone());
        let limiter = RateLimiter::new("counter-login", 10, 60_000, store);
        (
            LoginWorkflow::new(remote.clone(), limiter, session.clone()),
            remote,
            session,
        )
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[tokio::test]
    async fn test_successful_login_normalizes_email() {
        let (login, _, session) = setup(None);
        let outcome = login
            .login("  OPS@example.com ", &secret("correct-horse"))
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::SignedIn(_)));
        assert_eq!(session.current().unwrap().email(), "ops@example.com");

        let again = login.login("other@example.com", &secret("whatever1")).await.unwrap();
        assert!(matches!(again, LoginOutcome::AlreadySignedIn(_)));
        assert_eq!(again.identity().email(), "ops@example.com");
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let (login, _, session) = setup(None);
        let err = login
            .login("ops@example.com", &secret("wrong-horse"))
            .await
            .unwrap_err();
        assert_eq!(err, GateError::InvalidCredentials);
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_shape_checks_skip_remote() {
        let (login, remote, _) = setup(None);
        assert_eq!(
            login.login("not-an-email", &secret("correct-horse")).await,
            Err(GateError::MalformedInput(InputField::Email))
        );
        assert_eq!(
            login.login("ops@example.com", &secret("short")).await,
            Err(GateError::MalformedInput(InputField::Password))
        );
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_rate_limited() {
        let (login, remote, _) = setup(None);
        for _ in 0..10 {
            assert_eq!(
                login.login("ops@example.com", &secret("wrong-horse")).await,
                Err(GateError::InvalidCredentials)
            );
        }
        assert_eq!(
            login.login("ops@example.com", &secret("correct-horse")).await,
            Err(GateError::RateLimited)
        );
        assert_eq!(remote.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_remote_failure_is_classified() {
        let (login, _, session) = setup(Some(RemoteError::Remote {
            status: 404,
            code: Some("42883".into()),
            message: "function crypt(text, text) does not exist".into(),
        }));
        let err = login
            .login("ops@example.com", &secret("correct-horse"))
            .await
            .unwrap_err();
        assert!(err.user_message().contains("pgcrypto"));
        assert!(session.current().is_none());
    }
}
