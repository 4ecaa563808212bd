//! Identity subsystem.
//!
//! # Data Flow
//! ```text
//! key_store.rs (load key by SKI) / wallet.rs (hex, env)
//!     → Signer capability
//!     → IdentityContext (msp id + signer)
//!     → transaction ids, proposal / envelope / event request signatures
//! ```
//!
//! # Security Constraints
//! - Never log private keys or signatures
//! - Signing and verification are behind traits; the crate ships one
//!   secp256k1 implementation but does not depend on it elsewhere

pub mod key_store;
pub mod types;
pub mod wallet;

use rand::RngCore;
use std::fmt;
use std::sync::Arc;

pub use key_store::{CryptoKeyStore, FileSystemKeyValueStore, InMemoryKeyValueStore, KeyValueStore};
pub use types::{IdentityError, IdentityResult, Signer, Verifier};
pub use wallet::{Secp256k1Verifier, Wallet};

/// Length of the random nonce mixed into every transaction id.
pub const NONCE_LENGTH: usize = 24;

/// A freshly minted transaction identifier and the nonce it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionId {
    pub id: String,
    pub nonce: Vec<u8>,
}

/// The client's identity: MSP membership plus a signing capability.
#[derive(Clone)]
pub struct IdentityContext {
    msp_id: String,
    signer: Arc<dyn Signer>,
}

impl IdentityContext {
    pub fn new(msp_id: impl Into<String>, signer: Arc<dyn Signer>) -> Self {
        Self {
            msp_id: msp_id.into(),
            signer,
        }
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Serialized creator identity.
    pub fn creator(&self) -> Vec<u8> {
        self.signer.credentials()
    }

    /// Sign bytes with the identity's key.
    pub fn sign(&self, message: &[u8]) -> IdentityResult<Vec<u8>> {
        self.signer.sign(message)
    }

    pub fn hash(&self, message: &[u8]) -> Vec<u8> {
        self.signer.hash(message)
    }

    /// Mint a new transaction id: hex(hash(nonce || creator)).
    pub fn calculate_transaction_id(&self) -> TransactionId {
        let mut nonce = vec![0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut material = nonce.clone();
        material.extend_from_slice(&self.signer.credentials());
        let id = alloy::hex::encode(self.signer.hash(&material));

        TransactionId { id, nonce }
    }
}

impl fmt::Debug for IdentityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityContext")
            .field("msp_id", &self.msp_id)
            .finish()
    }
}
