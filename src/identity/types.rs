//! Identity capability traits and error definitions.

use thiserror::Error;

/// Errors that can occur while signing, verifying or loading keys.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Invalid private key format or derivation error.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// Signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Malformed signature or public key.
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Key store backend failure.
    #[error("Key store error: {0}")]
    Store(String),
}

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Signing half of the crypto capability.
///
/// Implementations hold a private key and know the serialized identity
/// (certificate or public key) that peers use to check the signature.
pub trait Signer: Send + Sync {
    /// Serialized identity embedded as the creator of proposals.
    fn credentials(&self) -> Vec<u8>;

    /// Hash a message with the identity's hash function.
    fn hash(&self, message: &[u8]) -> Vec<u8>;

    /// Sign a message. Implementations hash before signing.
    fn sign(&self, message: &[u8]) -> IdentityResult<Vec<u8>>;
}

/// Verification half of the crypto capability.
pub trait Verifier: Send + Sync {
    /// Check `signature` over `digest` against the public `key`.
    fn verify(&self, key: &[u8], signature: &[u8], digest: &[u8]) -> IdentityResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IdentityError::InvalidKey("odd length".to_string());
        assert_eq!(err.to_string(), "Invalid private key: odd length");
    }
}
