//! Standard paths used by keymaster

use std::path::PathBuf;

/// Standard keymaster paths
pub struct Paths {
    /// Data directory (~/.local/share/keymaster)
    pub data: PathBuf,
    /// Config directory (~/.config/keymaster)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("keymaster");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("keymaster");

        Self { data, config }
    }

    /// Path of the YAML configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("keymaster.yaml")
    }

    /// Default root of the encrypted file vault. The vault keeps its
    /// records in `vault/` and its identity in `keys/` below this.
    pub fn vault_root(&self) -> PathBuf {
        self.data.clone()
    }
}
