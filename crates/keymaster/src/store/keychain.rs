//! OS keychain engine
//!
//! Records are filed under one keychain service (default `keymaster`) with
//! the secret's key as the account name:
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring / KWallet)
//! - Windows: Credential Manager

use super::{SecretStore, StoreError};
use keyring::{Entry, Error as KeyringError};
use tracing::debug;
use zeroize::Zeroizing;

pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service, key).map_err(engine_error)
    }
}

impl SecretStore for KeychainStore {
    fn insert_if_absent(&self, key: &str, secret: &[u8]) -> Result<(), StoreError> {
        let entry = self.entry(key)?;

        // The keychain API overwrites on set, so look the entry up first.
        if lookup(key, entry.get_password())?.is_some() {
            return Err(StoreError::Duplicate(key.to_string()));
        }

        let value = std::str::from_utf8(secret)
            .map_err(|_| StoreError::Engine("keychain entries must be UTF-8 text".to_string()))?;

        debug!(service = %self.service, key, "writing keychain entry");
        entry.set_password(value).map_err(engine_error)
    }

    fn find_one(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError> {
        let entry = self.entry(key)?;
        debug!(service = %self.service, key, "reading keychain entry");
        lookup(key, entry.get_password())
    }

    fn delete_one(&self, key: &str) -> Result<(), StoreError> {
        let entry = self.entry(key)?;
        debug!(service = %self.service, key, "deleting keychain entry");
        match entry.delete_password() {
            Ok(()) => Ok(()),
            Err(KeyringError::NoEntry) => Err(StoreError::NotFound(key.to_string())),
            Err(KeyringError::Ambiguous(_)) => Err(StoreError::Ambiguous(key.to_string())),
            Err(err) => Err(engine_error(err)),
        }
    }
}

/// Translate a keychain read into the engine contract.
///
/// Undecodable bytes are handed back raw so the caller's UTF-8 check is the
/// one that rejects them.
fn lookup(
    key: &str,
    result: keyring::Result<String>,
) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError> {
    match result {
        Ok(value) => Ok(Some(Zeroizing::new(value.into_bytes()))),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(KeyringError::BadEncoding(bytes)) => Ok(Some(Zeroizing::new(bytes))),
        Err(KeyringError::Ambiguous(_)) => Err(StoreError::Ambiguous(key.to_string())),
        Err(err) => Err(engine_error(err)),
    }
}

fn engine_error(err: KeyringError) -> StoreError {
    StoreError::Engine(format!("keychain error: {}", err))
}
