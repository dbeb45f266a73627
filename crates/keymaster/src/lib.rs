//! keymaster - Keychain secrets guarded by biometric presence
//!
//! "Every secret costs one fingerprint."
//!
//! Each invocation performs exactly one get, set or delete against a secret
//! store, and only after a fresh, successful owner-presence challenge. A
//! failed, cancelled or unavailable challenge ends the invocation without
//! the store ever being consulted.

pub mod cli;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod operation;
pub mod store;

#[cfg(test)]
mod testing;

pub use dispatch::Report;
pub use error::KeymasterError;
pub use gate::{AuthOutcome, AuthPolicy, Authenticator, PresenceGate};
pub use operation::Operation;
pub use store::{SecretStore, StoreError};
