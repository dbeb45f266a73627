//! Command-line surface

use crate::error::KeymasterError;
use crate::operation::Operation;
use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use std::ffi::OsString;

#[derive(Parser)]
#[command(name = "keymaster")]
#[command(about = "Keychain secrets guarded by a fresh biometric check on every access")]
#[command(version)]
#[command(after_help = r#"EXAMPLES:
    keymaster set api-token abc123
    keymaster get api-token
    export TOKEN=$(keymaster get -n api-token)
    keymaster delete api-token

SECURITY:
    - Every get, set and delete asks for your fingerprint again
    - Nothing is cached between invocations
    - Secret values never appear in errors or logs"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a secret to stdout
    Get {
        /// Don't print trailing newline (useful for piping)
        #[arg(short = 'n')]
        no_newline: bool,
        /// Secret key name
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        key: String,
    },

    /// Store a new secret (fails if the key already exists)
    Set {
        /// Secret key name
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        key: String,
        /// Secret value
        #[arg(value_parser = clap::value_parser!(OsString), allow_hyphen_values = true)]
        secret: OsString,
    },

    /// Delete a secret
    Delete {
        /// Secret key name
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        key: String,
    },
}

/// A fully validated command line
#[derive(Debug)]
pub struct Invocation {
    pub operation: Operation,
    pub no_newline: bool,
}

impl TryFrom<Commands> for Invocation {
    type Error = KeymasterError;

    fn try_from(command: Commands) -> Result<Self, Self::Error> {
        let (operation, no_newline) = match command {
            Commands::Get { no_newline, key } => (Operation::get(key)?, no_newline),
            Commands::Set { key, secret } => (Operation::set(key, secret)?, false),
            Commands::Delete { key } => (Operation::delete(key)?, false),
        };
        Ok(Self {
            operation,
            no_newline,
        })
    }
}

/// Parse argv (program name first) into an invocation.
///
/// Help and version requests come back as `Usage` errors whose inner clap
/// error does not target stderr; the caller prints those and exits 0.
pub fn parse<I, T>(args: I) -> Result<Invocation, KeymasterError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).map_err(KeymasterError::Usage)?;
    Invocation::try_from(cli.command)
}
