//! Secret storage engines
//!
//! Every engine keeps at most one record per key and compares keys as exact,
//! case-sensitive strings.

pub mod keychain;
#[cfg(unix)]
pub mod vault;

pub use keychain::KeychainStore;
#[cfg(unix)]
pub use vault::VaultStore;

use thiserror::Error;
use zeroize::Zeroizing;

/// Why an engine refused an operation. Never includes the secret value.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a secret named {0} already exists")]
    Duplicate(String),

    #[error("no secret named {0}")]
    NotFound(String),

    #[error("more than one secret matches {0}")]
    Ambiguous(String),

    #[error("{0}")]
    Engine(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Engine(format!("{:#}", err))
    }
}

/// Keyed secret storage
pub trait SecretStore {
    /// Store `secret` under `key`, failing if the key is already taken
    fn insert_if_absent(&self, key: &str, secret: &[u8]) -> Result<(), StoreError>;

    /// Fetch the single record stored under `key`
    fn find_one(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError>;

    /// Remove the record stored under `key`
    fn delete_one(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: SecretStore + ?Sized> SecretStore for Box<S> {
    fn insert_if_absent(&self, key: &str, secret: &[u8]) -> Result<(), StoreError> {
        (**self).insert_if_absent(key, secret)
    }

    fn find_one(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError> {
        (**self).find_one(key)
    }

    fn delete_one(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete_one(key)
    }
}
