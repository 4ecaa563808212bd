//! Key storage.
//!
//! [`CryptoKeyStore`] persists signing keys through an injected
//! [`KeyValueStore`] backend. Two backends are provided: an in-memory map and
//! a directory of files.

use alloy::signers::local::PrivateKeySigner;
use dashmap::DashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::identity::types::{IdentityError, IdentityResult};
use crate::identity::wallet::Wallet;

/// Storage backend addressed by name.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the name is unknown.
    fn get_value(&self, name: &str) -> IdentityResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set_value(&self, name: &str, value: &str) -> IdentityResult<()>;
}

/// Thread-safe in-memory backend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyValueStore {
    inner: Arc<DashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get_value(&self, name: &str) -> IdentityResult<Option<String>> {
        Ok(self.inner.get(name).map(|r| r.value().clone()))
    }

    fn set_value(&self, name: &str, value: &str) -> IdentityResult<()> {
        self.inner.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Backend storing one file per name under a directory.
#[derive(Debug, Clone)]
pub struct FileSystemKeyValueStore {
    dir: PathBuf,
}

impl FileSystemKeyValueStore {
    /// Open (and create if needed) the store directory.
    pub fn new(dir: impl AsRef<Path>) -> IdentityResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| IdentityError::Store(e.to_string()))?;
        Ok(Self { dir })
    }
}

impl KeyValueStore for FileSystemKeyValueStore {
    fn get_value(&self, name: &str) -> IdentityResult<Option<String>> {
        match fs::read_to_string(self.dir.join(name)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IdentityError::Store(e.to_string())),
        }
    }

    fn set_value(&self, name: &str, value: &str) -> IdentityResult<()> {
        fs::write(self.dir.join(name), value).map_err(|e| IdentityError::Store(e.to_string()))
    }
}

/// Signing key store composed over a storage backend.
#[derive(Debug, Clone)]
pub struct CryptoKeyStore<S> {
    backend: S,
}

impl<S: KeyValueStore> CryptoKeyStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Persist a wallet's private key. Returns its subject key identifier.
    pub fn put_key(&self, wallet: &Wallet) -> IdentityResult<String> {
        let ski = ski_for(wallet);
        self.backend.set_value(&private_key_name(&ski), &wallet.private_key_hex())?;
        tracing::debug!(ski = %ski, "Stored private key");
        Ok(ski)
    }

    /// Load the wallet stored under a subject key identifier.
    pub fn get_key(&self, ski: &str) -> IdentityResult<Option<Wallet>> {
        match self.backend.get_value(&private_key_name(ski))? {
            Some(hex) => {
                let signer: PrivateKeySigner = hex
                    .trim()
                    .parse()
                    .map_err(|e| IdentityError::InvalidKey(format!("Stored key {} is corrupt: {}", ski, e)))?;
                Ok(Some(Wallet::from_signer(signer)))
            }
            None => Ok(None),
        }
    }
}

fn ski_for(wallet: &Wallet) -> String {
    alloy::hex::encode(wallet.address().as_slice())
}

fn private_key_name(ski: &str) -> String {
    format!("{}-priv", ski)
}
