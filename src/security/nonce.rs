//! Per-request CSP nonce.

use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

/// Entropy per nonce in bytes.
const NONCE_BYTES: usize = 16;

#[derive(Debug, Error)]
#[error("failed to generate nonce: {0}")]
pub struct NonceError(#[from] rand::Error);

/// Base64-encoded random token valid for exactly one request.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Nonce(String);

impl Nonce {
    /// Draw a fresh nonce from the operating system RNG.
    pub fn generate() -> Result<Self, NonceError> {
        let mut bytes = [0u8; NONCE_BYTES];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(Self(
            base64::engine::general_purpose::STANDARD.encode(bytes),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The CSP source expression, e.g. `'nonce-abc='`.
    pub fn source(&self) -> String {
        format!("'nonce-{}'", self.0)
    }
}

impl std::fmt::Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Nonce").field(&self.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_nonce_is_base64_of_16_bytes() {
        let nonce = Nonce::generate().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(nonce.as_str())
            .unwrap();
        assert_eq!(decoded.len(), NONCE_BYTES);
        assert_eq!(nonce.source(), format!("'nonce-{}'", nonce));
    }

    #[test]
    fn test_nonces_do_not_repeat() {
        let nonces: HashSet<_> = (0..1000).map(|_| Nonce::generate().unwrap()).collect();
        assert_eq!(nonces.len(), 1000);
    }
}
