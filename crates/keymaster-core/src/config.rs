//! keymaster configuration
//!
//! Configuration file: ~/.config/keymaster/keymaster.yaml
//!
//! ```yaml
//! store: keychain        # or: vault
//! service: keymaster     # keychain service the records are filed under
//! vault_root: ~/.local/share/keymaster
//! authenticator: touchid # or: fprintd, none (default depends on the OS)
//! ```
//!
//! There is no setting for how long a successful authentication may be
//! reused. Every invocation challenges the owner again.

use crate::paths::Paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which storage engine holds the secrets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// The operating system keychain
    #[default]
    Keychain,
    /// Age-encrypted files under `vault_root`
    Vault,
}

/// Which platform service performs the presence challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticatorKind {
    /// macOS LocalAuthentication (Touch ID)
    #[serde(rename = "touchid")]
    TouchId,
    /// Linux fingerprint daemon (fprintd-list / fprintd-verify)
    Fprintd,
    /// No biometric hardware; every challenge is refused
    #[serde(rename = "none")]
    Disabled,
}

impl Default for AuthenticatorKind {
    /// The biometric service native to the build target
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::TouchId
        } else if cfg!(target_os = "linux") {
            Self::Fprintd
        } else {
            Self::Disabled
        }
    }
}

/// Global keymaster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeymasterConfig {
    #[serde(default)]
    pub store: StoreKind,

    #[serde(default = "default_service")]
    pub service: String,

    /// Vault root, defaults to the data directory
    #[serde(default)]
    pub vault_root: Option<PathBuf>,

    #[serde(default)]
    pub authenticator: AuthenticatorKind,
}

fn default_service() -> String {
    "keymaster".to_string()
}

impl Default for KeymasterConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            service: default_service(),
            vault_root: None,
            authenticator: AuthenticatorKind::default(),
        }
    }
}

impl KeymasterConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Paths::new().config_file())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read keymaster config from {:?}", path))?;
            let config: Self = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse keymaster config from {:?}", path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved vault root
    pub fn vault_root(&self) -> PathBuf {
        match &self.vault_root {
            Some(dir) => expand_home(dir),
            None => Paths::new().vault_root(),
        }
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
