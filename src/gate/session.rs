//! Operator session identity in page-scoped storage.
//!
//! Presence of the identity gates the verification screen; absence sends the
//! operator back to login.

use std::sync::Arc;

use crate::storage::{KeyValueStore, StoreError};

/// Storage key holding the signed-in operator's email.
pub const SESSION_KEY: &str = "counter:email";

/// The authenticated operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    email: String,
}

impl SessionIdentity {
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Read/write access to the session identity.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The current identity. An unreadable store counts as signed out.
    pub fn current(&self) -> Option<SessionIdentity> {
        match self.store.get(SESSION_KEY) {
            Ok(Some(email)) if !email.trim().is_empty() => Some(SessionIdentity { email }),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Session store unreadable, treating as signed out");
                None
            }
        }
    }

    /// Persist a freshly authenticated operator.
    pub fn establish(&self, email: &str) -> Result<SessionIdentity, StoreError> {
        self.store.set(SESSION_KEY, email)?;
        tracing::info!(operator = %email, "Operator session established");
        Ok(SessionIdentity {
            email: email.to_string(),
        })
    }

    /// Drop the identity, regardless of workflow state.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(SESSION_KEY)?;
        tracing::info!("Operator session cleared");
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
