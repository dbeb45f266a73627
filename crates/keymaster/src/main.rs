//! keymaster - Keychain secrets guarded by biometric presence
//!
//! Commands:
//! - get [-n] <KEY>: Print a secret
//! - set <KEY> <SECRET>: Store a new secret
//! - delete <KEY>: Delete a secret

use keymaster::gate::platform_authenticator;
#[cfg(unix)]
use keymaster::store::VaultStore;
use keymaster::store::KeychainStore;
use keymaster::{cli, dispatch, AuthPolicy, KeymasterError, PresenceGate, SecretStore};
use keymaster_core::{KeymasterConfig, StoreKind};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr; stdout carries only the secret or confirmation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let code = match run() {
        Ok(()) => 0,
        Err(e) => {
            debug!(error = ?e, "invocation failed");
            eprintln!("{}", e);
            e.exit_code()
        }
    };
    process::exit(code);
}

fn run() -> Result<(), KeymasterError> {
    let invocation = match cli::parse(std::env::args_os()) {
        Err(KeymasterError::Usage(e)) if !e.use_stderr() => e.exit(),
        result => result?,
    };

    let config = KeymasterConfig::load().map_err(KeymasterError::Config)?;
    debug!(store = ?config.store, authenticator = ?config.authenticator, "loaded configuration");

    let gate = PresenceGate::new(
        platform_authenticator(config.authenticator),
        AuthPolicy::DeviceOwnerBiometrics,
    );
    let store = store(&config)?;

    let report = dispatch::run(&invocation.operation, &gate, &store)?;
    report.write_to(&mut std::io::stdout().lock(), invocation.no_newline)
}

fn store(config: &KeymasterConfig) -> Result<Box<dyn SecretStore>, KeymasterError> {
    match config.store {
        StoreKind::Keychain => Ok(Box::new(KeychainStore::new(config.service.clone()))),
        #[cfg(unix)]
        StoreKind::Vault => Ok(Box::new(VaultStore::new(&config.vault_root()))),
        #[cfg(not(unix))]
        StoreKind::Vault => Err(KeymasterError::Config(anyhow::anyhow!(
            "the vault store needs a Unix filesystem"
        ))),
    }
}
