//! Linux fingerprint authenticator backed by fprintd
//!
//! Availability is `fprintd-list <user>` reporting at least one enrolled
//! finger. A challenge is one `fprintd-verify <user>` run on a worker
//! thread; fprintd keeps no authentication state between runs.

use super::{AuthPolicy, Authenticator, Completion, EvaluationRequest};
use std::io;
use std::process::{Command, Output};
use std::thread;
use tracing::{debug, warn};

pub struct FprintdAuthenticator {
    user: Option<String>,
    /// Program and leading arguments; the user name is appended
    list_command: Vec<String>,
    verify_command: Vec<String>,
}

impl Default for FprintdAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl FprintdAuthenticator {
    /// Authenticate the user this process runs as
    pub fn new() -> Self {
        let user = std::env::var("USER").ok().filter(|u| !u.is_empty());
        Self::with_commands(
            user,
            vec!["fprintd-list".to_string()],
            vec!["fprintd-verify".to_string()],
        )
    }

    pub fn with_commands(
        user: Option<String>,
        list_command: Vec<String>,
        verify_command: Vec<String>,
    ) -> Self {
        Self {
            user,
            list_command,
            verify_command,
        }
    }

    fn user(&self) -> Result<&str, String> {
        self.user
            .as_deref()
            .ok_or_else(|| "cannot determine the current user".to_string())
    }
}

impl Authenticator for FprintdAuthenticator {
    fn policy_available(&self, policy: AuthPolicy) -> Result<(), String> {
        let user = self.user()?;
        debug!(policy = policy.name(), user, "checking fingerprint enrollment");

        let output = command(&self.list_command, user)
            .and_then(|mut cmd| cmd.output())
            .map_err(|e| format!("fprintd is not available ({})", e))?;

        enrollment(user, &output)
    }

    fn evaluate(&self, request: EvaluationRequest, completion: Completion) {
        let user = match self.user() {
            Ok(user) => user.to_string(),
            Err(why) => return completion(false, Some(why)),
        };
        let argv = self.verify_command.clone();

        // Hands `completion` to the worker; if the thread cannot start it is
        // dropped unused, which the gate reads as a failed challenge.
        let spawned = thread::Builder::new()
            .name("fprintd-verify".to_string())
            .spawn(move || {
                eprintln!("keymaster: scan your fingerprint to {}", request.reason);
                let (success, error) = match command(&argv, &user).and_then(|mut cmd| cmd.output()) {
                    Ok(output) => verification(&output),
                    Err(e) => (false, Some(format!("could not run fprintd-verify ({})", e))),
                };
                completion(success, error);
            });

        if let Err(e) = spawned {
            warn!(error = %e, "failed to start fingerprint verification");
        }
    }
}

fn command(argv: &[String], user: &str) -> io::Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
    let mut cmd = Command::new(program);
    cmd.args(args).arg(user);
    Ok(cmd)
}

/// Interpret `fprintd-list` output
fn enrollment(user: &str, output: &Output) -> Result<(), String> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if stdout.contains("No devices available") || stderr.contains("No devices available") {
        return Err("no fingerprint reader found".to_string());
    }
    if stdout.contains("has no fingers enrolled") {
        return Err(format!("no fingerprints are enrolled for {}", user));
    }
    if !output.status.success() {
        let detail = stderr.lines().next().unwrap_or("").trim();
        return Err(format!("fprintd-list failed: {}", detail));
    }
    if stdout.lines().any(|line| line.trim_start().starts_with("- #")) {
        Ok(())
    } else {
        Err(format!("no fingerprints are enrolled for {}", user))
    }
}

/// Interpret `fprintd-verify` output as `(success, error description)`
fn verification(output: &Output) -> (bool, Option<String>) {
    let stdout = String::from_utf8_lossy(&output.stdout);

    let result = stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Verify result:"))
        .last()
        .map(|rest| rest.split_whitespace().next().unwrap_or("").to_string());

    match result.as_deref() {
        Some("verify-match") if output.status.success() => (true, None),
        Some("verify-no-match") => (false, Some("fingerprint did not match".to_string())),
        Some(other) if !other.is_empty() => (
            false,
            Some(format!("fingerprint verification ended with {}", other)),
        ),
        _ => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().next().unwrap_or("no result").trim().to_string();
            (false, Some(format!("fingerprint verification failed: {}", detail)))
        }
    }
}
