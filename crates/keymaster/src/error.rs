//! Terminal errors of a keymaster invocation
//!
//! Each variant renders as exactly one diagnostic line. None of them ever
//! carries secret material.

use crate::store::StoreError;
use thiserror::Error;

/// One-line usage text
pub const USAGE: &str = "usage: keymaster [get|set|delete] <key> [secret]";

#[derive(Error, Debug)]
pub enum KeymasterError {
    /// Malformed command line
    #[error("{}", USAGE)]
    Usage(#[source] clap::Error),

    #[error("Error: key must not be empty")]
    EmptyKey,

    /// The device cannot run the biometric owner policy
    #[error("This device doesn't support deviceOwnerAuthenticationWithBiometrics: {0}")]
    PolicyUnavailable(String),

    /// The challenge failed or was cancelled
    #[error("Authentication failed or was canceled: {0}")]
    Authentication(String),

    #[error("Error: Failed to convert password string to UTF-8 bytes")]
    Encoding,

    /// The storage engine rejected a set or delete
    #[error("Error {action} password: {source}")]
    Storage {
        action: &'static str,
        #[source]
        source: StoreError,
    },

    /// Get found nothing usable under the key
    #[error("Error getting password: {reason}")]
    NotFoundOrDecode { key: String, reason: String },

    #[error("Error loading configuration: {0:#}")]
    Config(anyhow::Error),

    /// The result could not be written to stdout
    #[error("Error writing output: {0}")]
    Output(#[source] std::io::Error),
}

impl KeymasterError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::EmptyKey => 2,
            _ => 1,
        }
    }
}
