//! The single operation a keymaster invocation performs

use crate::error::KeymasterError;
use std::ffi::OsString;
use std::fmt;
use zeroize::Zeroizing;

/// A parsed request against the secret store
pub enum Operation {
    Set {
        key: String,
        secret: Zeroizing<Vec<u8>>,
    },
    Get {
        key: String,
    },
    Delete {
        key: String,
    },
}

impl Operation {
    /// Build a Set, rejecting secrets that are not valid UTF-8
    pub fn set(key: String, secret: OsString) -> Result<Self, KeymasterError> {
        let key = non_empty(key)?;
        let secret = secret
            .into_string()
            .map_err(|_| KeymasterError::Encoding)?;

        Ok(Self::Set {
            key,
            secret: Zeroizing::new(secret.into_bytes()),
        })
    }

    pub fn get(key: String) -> Result<Self, KeymasterError> {
        Ok(Self::Get {
            key: non_empty(key)?,
        })
    }

    pub fn delete(key: String) -> Result<Self, KeymasterError> {
        Ok(Self::Delete {
            key: non_empty(key)?,
        })
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Get { key } | Self::Delete { key } => key,
        }
    }

    /// Justification shown by the presence challenge
    pub fn reason(&self) -> String {
        let verb = match self {
            Self::Set { .. } => "set",
            Self::Get { .. } => "access",
            Self::Delete { .. } => "delete",
        };
        format!("{} the password for {}", verb, self.key())
    }
}

fn non_empty(key: String) -> Result<String, KeymasterError> {
    if key.is_empty() {
        return Err(KeymasterError::EmptyKey);
    }
    Ok(key)
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { key, .. } => f
                .debug_struct("Set")
                .field("key", key)
                .field("secret", &"<redacted>")
                .finish(),
            Self::Get { key } => f.debug_struct("Get").field("key", key).finish(),
            Self::Delete { key } => f.debug_struct("Delete").field("key", key).finish(),
        }
    }
}
