//! Guarded secret operation
//!
//! `Parsed → Gating → Authenticated → Executing → Succeeded | Failed`, or
//! `Gating → Denied`. The gate is the only suspension point, and the store
//! is touched at most once, strictly after a successful challenge.

use crate::error::KeymasterError;
use crate::gate::{AuthOutcome, Authenticator, PresenceGate};
use crate::operation::Operation;
use crate::store::{SecretStore, StoreError};
use std::fmt;
use std::io::Write;
use tracing::debug;
use zeroize::Zeroizing;

/// Successful terminal result of an invocation
pub enum Report {
    /// Decoded secret, printed alone for scripting
    Secret(Zeroizing<String>),
    /// Confirmation naming the key
    Confirmation(String),
}

impl Report {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Secret(secret) => secret.as_str(),
            Self::Confirmation(message) => message.as_str(),
        }
    }

    /// Write the report as the invocation's single line of output.
    /// `no_newline` applies to secrets only.
    pub fn write_to<W: Write>(&self, out: &mut W, no_newline: bool) -> Result<(), KeymasterError> {
        let result = match self {
            Self::Secret(secret) if no_newline => out.write_all(secret.as_bytes()),
            _ => writeln!(out, "{}", self.as_str()),
        };
        result
            .and_then(|()| out.flush())
            .map_err(KeymasterError::Output)
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret(_) => f.write_str("Secret(<redacted>)"),
            Self::Confirmation(message) => f.debug_tuple("Confirmation").field(message).finish(),
        }
    }
}

/// Challenge the owner, then run `operation` against `store` if and only if
/// the challenge succeeded.
pub fn run<A, S>(
    operation: &Operation,
    gate: &PresenceGate<A>,
    store: &S,
) -> Result<Report, KeymasterError>
where
    A: Authenticator,
    S: SecretStore + ?Sized,
{
    match gate.challenge(&operation.reason()) {
        AuthOutcome::Success => execute(operation, store),
        AuthOutcome::Failure(why) => Err(KeymasterError::Authentication(why)),
        AuthOutcome::Unavailable(why) => Err(KeymasterError::PolicyUnavailable(why)),
    }
}

fn execute<S: SecretStore + ?Sized>(
    operation: &Operation,
    store: &S,
) -> Result<Report, KeymasterError> {
    debug!(key = operation.key(), "executing guarded operation");

    match operation {
        Operation::Set { key, secret } => {
            store
                .insert_if_absent(key, secret)
                .map_err(|source| KeymasterError::Storage {
                    action: "setting",
                    source,
                })?;
            Ok(Report::Confirmation(format!(
                "Key {} has been successfully set in the keychain",
                key
            )))
        }
        Operation::Get { key } => {
            let not_found = |reason: String| KeymasterError::NotFoundOrDecode {
                key: key.clone(),
                reason,
            };

            let bytes = store
                .find_one(key)
                .map_err(|e| not_found(e.to_string()))?
                .ok_or_else(|| not_found(StoreError::NotFound(key.clone()).to_string()))?;

            let secret = std::str::from_utf8(&bytes)
                .map_err(|_| not_found(format!("the value stored for {} is not valid UTF-8", key)))?;

            Ok(Report::Secret(Zeroizing::new(secret.to_string())))
        }
        Operation::Delete { key } => {
            store
                .delete_one(key)
                .map_err(|source| KeymasterError::Storage {
                    action: "deleting",
                    source,
                })?;
            Ok(Report::Confirmation(format!(
                "Key {} has been successfully deleted from the keychain",
                key
            )))
        }
    }
}
