//! Local key signing identity.
//!
//! # Security
//! - Private keys are loaded from hex strings, environment variables or a key store
//! - Keys are never logged or serialized by this module
//! - Signatures are recoverable secp256k1 over a keccak256 digest

use alloy::primitives::{keccak256, Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::identity::types::{IdentityError, IdentityResult, Signer, Verifier};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "FABRIC_GATEWAY_PRIVATE_KEY";

/// Signing identity backed by an in-process secp256k1 key.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    pub fn from_private_key(private_key_hex: &str) -> IdentityResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| IdentityError::InvalidKey(format!("Invalid private key format: {}", e)))?;

        tracing::debug!(address = %signer.address(), "Wallet initialized");

        Ok(Self { signer })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `FABRIC_GATEWAY_PRIVATE_KEY` from environment.
    pub fn from_env() -> IdentityResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            IdentityError::InvalidKey(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Generate a fresh random key.
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    pub(crate) fn from_signer(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Get the wallet's address. It doubles as the subject key identifier.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Hex-encoded private key, for persisting into a key store.
    pub(crate) fn private_key_hex(&self) -> String {
        alloy::hex::encode(self.signer.to_bytes())
    }
}

impl Signer for Wallet {
    fn credentials(&self) -> Vec<u8> {
        self.signer.address().as_slice().to_vec()
    }

    fn hash(&self, message: &[u8]) -> Vec<u8> {
        keccak256(message).to_vec()
    }

    fn sign(&self, message: &[u8]) -> IdentityResult<Vec<u8>> {
        let digest = keccak256(message);
        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| IdentityError::Signing(e.to_string()))?;
        Ok(signature.as_bytes().to_vec())
    }
}

/// Verifier for signatures produced by [`Wallet`].
///
/// The key is the 20-byte signer address; the digest is the keccak256 hash
/// of the signed message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl Verifier for Secp256k1Verifier {
    fn verify(&self, key: &[u8], signature: &[u8], digest: &[u8]) -> IdentityResult<bool> {
        if key.len() != 20 {
            return Err(IdentityError::Verification(format!(
                "expected 20 byte key, got {}",
                key.len()
            )));
        }
        if digest.len() != 32 {
            return Err(IdentityError::Verification(format!(
                "expected 32 byte digest, got {}",
                digest.len()
            )));
        }
        let signature = Signature::from_raw(signature)
            .map_err(|e| IdentityError::Verification(e.to_string()))?;
        let recovered = signature
            .recover_address_from_prehash(&B256::from_slice(digest))
            .map_err(|e| IdentityError::Verification(e.to_string()))?;
        Ok(recovered == Address::from_slice(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet = Wallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY)).unwrap();
        assert_eq!(wallet.credentials().len(), 20);
        assert_eq!(wallet.private_key_hex(), TEST_PRIVATE_KEY);
    }

    #[test]
    fn test_invalid_private_key() {
        let result = Wallet::from_private_key("invalid_key");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[test]
    fn test_sign_and_verify() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let message = b"proposal bytes";
        let signature = wallet.sign(message).unwrap();
        assert_eq!(signature.len(), 65);

        let digest = wallet.hash(message);
        let verifier = Secp256k1Verifier;
        assert!(verifier.verify(&wallet.credentials(), &signature, &digest).unwrap());

        let other = Wallet::random();
        assert!(!verifier.verify(&other.credentials(), &signature, &digest).unwrap());
    }

    #[test]
    fn test_verify_rejects_bad_key_length() {
        let err = Secp256k1Verifier.verify(&[1, 2, 3], &[0; 65], &[0; 32]).unwrap_err();
        assert!(err.to_string().contains("20 byte key"));
    }
}
