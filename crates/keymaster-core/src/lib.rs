//! keymaster core - Shared functionality for the keymaster CLI
//!
//! Standard locations and the on-disk configuration that selects which
//! keychain and which presence authenticator the CLI talks to.

pub mod config;
pub mod paths;

pub use config::{AuthenticatorKind, KeymasterConfig, StoreKind};
pub use paths::Paths;
