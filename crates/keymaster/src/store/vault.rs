//! Vault - age-encrypted file engine
//!
//! Each secret is a separate age-encrypted file in the vault directory. The
//! file name is the lowercase hex form of the exact key, so any key string
//! maps to exactly one file without normalization, and two keys never share
//! a file even on a case-insensitive filesystem.

use super::{SecretStore, StoreError};
use age::secrecy::ExposeSecret;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, Read, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

/// Vault-specific errors
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),
}

/// The encrypted file vault
pub struct VaultStore {
    /// Root directory for the vault
    root: PathBuf,
    /// Directory for encrypted secrets
    vault_dir: PathBuf,
    /// Directory for identity keys
    keys_dir: PathBuf,
    /// Path to the identity key file
    identity_path: PathBuf,
}

impl VaultStore {
    pub fn new(root: &Path) -> Self {
        let vault_dir = root.join("vault");
        let keys_dir = root.join("keys");
        let identity_path = keys_dir.join("identity.key");

        Self {
            root: root.to_path_buf(),
            vault_dir,
            keys_dir,
            identity_path,
        }
    }

    /// Check if the vault has an identity yet
    pub fn is_initialized(&self) -> bool {
        self.identity_path.exists()
    }

    /// Create directories and the identity key on first use
    fn init(&self) -> Result<age::x25519::Identity> {
        fs::create_dir_all(&self.vault_dir)?;
        fs::create_dir_all(&self.keys_dir)?;

        fs::set_permissions(&self.root, Permissions::from_mode(0o700))?;
        fs::set_permissions(&self.vault_dir, Permissions::from_mode(0o700))?;
        fs::set_permissions(&self.keys_dir, Permissions::from_mode(0o700))?;

        if self.is_initialized() {
            return self.load_identity();
        }

        debug!(root = %self.root.display(), "generating vault identity");
        let identity = age::x25519::Identity::generate();
        let identity_str = identity.to_string();

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&self.identity_path)
            .context("Failed to create identity key")?;
        file.write_all(identity_str.expose_secret().as_bytes())?;
        file.sync_all()?;

        Ok(identity)
    }

    fn load_identity(&self) -> Result<age::x25519::Identity> {
        let content = Zeroizing::new(
            fs::read_to_string(&self.identity_path).context("Failed to read identity key")?,
        );

        content
            .trim()
            .parse::<age::x25519::Identity>()
            .map_err(|e| anyhow::anyhow!("Failed to parse identity: {}", e))
    }

    fn secret_path(&self, key: &str) -> PathBuf {
        self.vault_dir
            .join(format!("{}.age", hex::encode(key.as_bytes())))
    }

    fn encrypt(&self, identity: &age::x25519::Identity, plaintext: &[u8]) -> Result<Vec<u8>> {
        let recipient = identity.to_public();
        let encryptor = age::Encryptor::with_recipients(vec![Box::new(recipient)])
            .ok_or_else(|| VaultError::Encryption("no recipients".to_string()))?;

        let mut encrypted = vec![];
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        writer
            .write_all(plaintext)
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        writer
            .finish()
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        Ok(encrypted)
    }

    fn decrypt(
        &self,
        identity: &age::x25519::Identity,
        encrypted: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let decryptor = match age::Decryptor::new(encrypted)
            .map_err(|e| VaultError::Decryption(e.to_string()))?
        {
            age::Decryptor::Recipients(d) => d,
            _ => {
                return Err(VaultError::Decryption(
                    "Unexpected passphrase encryption".to_string(),
                )
                .into())
            }
        };

        let mut decrypted = Zeroizing::new(vec![]);
        let mut reader = decryptor
            .decrypt(std::iter::once(identity as &dyn age::Identity))
            .map_err(|e| VaultError::Decryption(e.to_string()))?;

        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| VaultError::Decryption(e.to_string()))?;

        Ok(decrypted)
    }

    /// Publish `encrypted` at `path` only if nothing is there yet.
    ///
    /// The ciphertext is fully written to a private temp file first and then
    /// hard-linked into place, so readers never see a partial record and two
    /// racing writers cannot both succeed.
    fn publish(&self, path: &Path, encrypted: &[u8]) -> io::Result<()> {
        let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
        let result = (|| {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(&tmp)?;
            file.write_all(encrypted)?;
            file.sync_all()?;
            fs::hard_link(&tmp, path)
        })();
        let _ = fs::remove_file(&tmp);
        result
    }
}

impl SecretStore for VaultStore {
    fn insert_if_absent(&self, key: &str, secret: &[u8]) -> Result<(), StoreError> {
        let identity = self.init()?;
        let secret_path = self.secret_path(key);

        if secret_path.exists() {
            return Err(StoreError::Duplicate(key.to_string()));
        }

        let encrypted = self.encrypt(&identity, secret)?;

        debug!(key, path = %secret_path.display(), "writing vault record");
        match self.publish(&secret_path, &encrypted) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::Duplicate(key.to_string()))
            }
            Err(e) => Err(StoreError::Engine(format!("Failed to write vault record: {}", e))),
        }
    }

    fn find_one(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError> {
        let secret_path = self.secret_path(key);
        if !self.is_initialized() || !secret_path.exists() {
            return Ok(None);
        }

        let identity = self.load_identity()?;

        let mut encrypted = vec![];
        File::open(&secret_path)
            .and_then(|mut file| file.read_to_end(&mut encrypted))
            .map_err(|e| StoreError::Engine(format!("Failed to read vault record: {}", e)))?;

        debug!(key, path = %secret_path.display(), "decrypting vault record");
        Ok(Some(self.decrypt(&identity, &encrypted)?))
    }

    fn delete_one(&self, key: &str) -> Result<(), StoreError> {
        let secret_path = self.secret_path(key);

        match fs::remove_file(&secret_path) {
            Ok(()) => {
                debug!(key, "deleted vault record");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(StoreError::Engine(format!(
                "Failed to delete vault record: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_vault() -> (VaultStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::new(&dir.path().join("vault-root"));
        (vault, dir)
    }

    #[test]
    fn test_insert_then_find() {
        let (vault, _dir) = temp_vault();
        assert!(!vault.is_initialized());

        vault.insert_if_absent("api/openai", b"sk-test123").unwrap();
        assert!(vault.is_initialized());

        let value = vault.find_one("api/openai").unwrap().unwrap();
        assert_eq!(&value[..], b"sk-test123");
    }

    #[test]
    fn test_ciphertext_on_disk() {
        let (vault, _dir) = temp_vault();
        vault.insert_if_absent("db", b"hunter2").unwrap();

        let raw = fs::read(vault.secret_path("db")).unwrap();
        assert!(!raw.windows(7).any(|w| w == b"hunter2"));

        let mode = fs::metadata(vault.secret_path("db")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_duplicate_keeps_original() {
        let (vault, _dir) = temp_vault();
        vault.insert_if_absent("token", b"first").unwrap();

        let err = vault.insert_if_absent("token", b"second").unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref k) if k == "token"));
        assert_eq!(&vault.find_one("token").unwrap().unwrap()[..], b"first");
    }

    #[test]
    fn test_keys_are_case_sensitive_and_exact() {
        let (vault, _dir) = temp_vault();
        vault.insert_if_absent("Token", b"upper").unwrap();
        vault.insert_if_absent("token", b"lower").unwrap();
        vault.insert_if_absent("../token", b"dots").unwrap();

        assert_eq!(&vault.find_one("Token").unwrap().unwrap()[..], b"upper");
        assert_eq!(&vault.find_one("token").unwrap().unwrap()[..], b"lower");
        assert_eq!(&vault.find_one("../token").unwrap().unwrap()[..], b"dots");
        assert!(vault.find_one("token ").unwrap().is_none());
    }

    #[test]
    fn test_file_names_survive_case_folding() {
        let (vault, _dir) = temp_vault();
        let keys = ["00a", "00G", "Token", "token", "TOKEN"];

        let mut folded: Vec<String> = keys
            .iter()
            .map(|key| {
                let name = vault.secret_path(key);
                let name = name.file_name().unwrap().to_string_lossy().to_string();
                assert_eq!(name, name.to_lowercase(), "mixed-case file name for {}", key);
                name.to_lowercase()
            })
            .collect();
        folded.sort();
        folded.dedup();
        assert_eq!(folded.len(), keys.len());
    }

    #[test]
    fn test_records_live_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::new(dir.path());
        assert_eq!(
            vault.secret_path("k").parent().unwrap(),
            dir.path().join("vault")
        );
    }

    #[test]
    fn test_find_before_init() {
        let (vault, _dir) = temp_vault();
        assert!(vault.find_one("anything").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let (vault, _dir) = temp_vault();
        vault.insert_if_absent("test/secret", b"value").unwrap();

        vault.delete_one("test/secret").unwrap();
        assert!(vault.find_one("test/secret").unwrap().is_none());

        let err = vault.delete_one("test/secret").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (vault, _dir) = temp_vault();
        vault.insert_if_absent("a", b"1").unwrap();
        let _ = vault.insert_if_absent("a", b"2");

        let names: Vec<String> = fs::read_dir(&vault.vault_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["61.age".to_string()]);
    }

    #[test]
    fn test_identity_reused() {
        let (vault, dir) = temp_vault();
        vault.insert_if_absent("one", b"1").unwrap();

        let reopened = VaultStore::new(&dir.path().join("vault-root"));
        reopened.insert_if_absent("two", b"2").unwrap();
        assert_eq!(&reopened.find_one("one").unwrap().unwrap()[..], b"1");
    }
}
