//! Presence gate
//!
//! Proves the device owner is present before any secret is touched. The gate
//! asks the platform whether the biometric owner policy can be evaluated,
//! then runs exactly one challenge and blocks until the platform's
//! completion handler delivers its single result.

pub mod fprintd;
#[cfg(target_os = "macos")]
pub mod local_auth;

pub use fprintd::FprintdAuthenticator;
#[cfg(target_os = "macos")]
pub use local_auth::LocalAuthenticator;

use keymaster_core::AuthenticatorKind;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Authentication policy evaluated by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Device owner via biometrics, with no fallback to a passcode
    DeviceOwnerBiometrics,
}

impl AuthPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeviceOwnerBiometrics => "deviceOwnerAuthenticationWithBiometrics",
        }
    }

    /// How long an earlier successful authentication may stand in for a new
    /// one. Always zero: every access needs a fresh challenge.
    pub fn reuse_window(&self) -> Duration {
        Duration::ZERO
    }
}

/// What the platform is asked to evaluate
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub policy: AuthPolicy,
    /// Human-readable justification shown to the owner
    pub reason: String,
    pub reuse_window: Duration,
}

/// Completion handler: `(success, error description)`, called at most once
pub type Completion = Box<dyn FnOnce(bool, Option<String>) + Send + 'static>;

/// Platform local-authentication service
pub trait Authenticator {
    /// Whether `policy` can be evaluated on this device, or why not
    fn policy_available(&self, policy: AuthPolicy) -> Result<(), String>;

    /// Start a challenge. The result is delivered through `completion`,
    /// possibly from another thread.
    fn evaluate(&self, request: EvaluationRequest, completion: Completion);
}

impl<A: Authenticator + ?Sized> Authenticator for Box<A> {
    fn policy_available(&self, policy: AuthPolicy) -> Result<(), String> {
        (**self).policy_available(policy)
    }

    fn evaluate(&self, request: EvaluationRequest, completion: Completion) {
        (**self).evaluate(request, completion)
    }
}

impl<A: Authenticator + ?Sized> Authenticator for &A {
    fn policy_available(&self, policy: AuthPolicy) -> Result<(), String> {
        (**self).policy_available(policy)
    }

    fn evaluate(&self, request: EvaluationRequest, completion: Completion) {
        (**self).evaluate(request, completion)
    }
}

/// Refuses every challenge, for hosts without biometric hardware
pub struct UnavailableAuthenticator {
    reason: String,
}

impl UnavailableAuthenticator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Authenticator for UnavailableAuthenticator {
    fn policy_available(&self, _policy: AuthPolicy) -> Result<(), String> {
        Err(self.reason.clone())
    }

    fn evaluate(&self, _request: EvaluationRequest, completion: Completion) {
        completion(false, Some(self.reason.clone()));
    }
}

/// The platform authenticator selected in the configuration
pub fn platform_authenticator(kind: AuthenticatorKind) -> Box<dyn Authenticator> {
    match kind {
        #[cfg(target_os = "macos")]
        AuthenticatorKind::TouchId => Box::new(LocalAuthenticator::new()),
        #[cfg(not(target_os = "macos"))]
        AuthenticatorKind::TouchId => Box::new(UnavailableAuthenticator::new(
            "Touch ID (LocalAuthentication) is only available on macOS",
        )),
        AuthenticatorKind::Fprintd => Box::new(FprintdAuthenticator::new()),
        AuthenticatorKind::Disabled => Box::new(UnavailableAuthenticator::new(
            "biometric authentication is disabled in the keymaster configuration",
        )),
    }
}

/// Result of one presence challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failure(String),
    Unavailable(String),
}

pub struct PresenceGate<A> {
    authenticator: A,
    policy: AuthPolicy,
}

impl<A: Authenticator> PresenceGate<A> {
    pub fn new(authenticator: A, policy: AuthPolicy) -> Self {
        Self {
            authenticator,
            policy,
        }
    }

    pub fn policy(&self) -> AuthPolicy {
        self.policy
    }

    pub fn check_availability(&self) -> Result<(), String> {
        self.authenticator.policy_available(self.policy)
    }

    /// Run one challenge and wait for its outcome.
    ///
    /// Must not be called from inside an async runtime: the wait is a
    /// blocking receive on a single-shot channel.
    pub fn challenge(&self, reason: &str) -> AuthOutcome {
        if let Err(why) = self.check_availability() {
            warn!(policy = self.policy.name(), %why, "presence policy unavailable");
            return AuthOutcome::Unavailable(why);
        }

        let (tx, rx) = oneshot::channel();
        let request = EvaluationRequest {
            policy: self.policy,
            reason: reason.to_string(),
            reuse_window: self.policy.reuse_window(),
        };

        debug!(policy = self.policy.name(), reason, "issuing presence challenge");
        self.authenticator.evaluate(
            request,
            Box::new(move |success, error| {
                // The receiver only goes away if the gate itself is gone.
                let _ = tx.send(fold(success, error));
            }),
        );

        let outcome = rx.blocking_recv().unwrap_or_else(|_| {
            AuthOutcome::Failure("authentication ended without a result".to_string())
        });

        match &outcome {
            AuthOutcome::Success => debug!("presence challenge succeeded"),
            AuthOutcome::Failure(why) | AuthOutcome::Unavailable(why) => {
                warn!(%why, "presence challenge denied")
            }
        }
        outcome
    }
}

/// Fold a platform callback into an outcome. Success requires both the flag
/// and the absence of an error.
fn fold(success: bool, error: Option<String>) -> AuthOutcome {
    match (success, error) {
        (true, None) => AuthOutcome::Success,
        (_, Some(why)) => AuthOutcome::Failure(why),
        (false, None) => AuthOutcome::Failure("Unknown error".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAuthenticator;

    #[test]
    fn test_fold() {
        assert_eq!(fold(true, None), AuthOutcome::Success);
        assert_eq!(
            fold(false, Some("user cancelled".into())),
            AuthOutcome::Failure("user cancelled".into())
        );
        assert_eq!(
            fold(true, Some("odd".into())),
            AuthOutcome::Failure("odd".into())
        );
        assert_eq!(
            fold(false, None),
            AuthOutcome::Failure("Unknown error".into())
        );
    }

    #[test]
    fn test_policy_has_no_reuse_window() {
        assert_eq!(AuthPolicy::DeviceOwnerBiometrics.reuse_window(), Duration::ZERO);
    }

    #[test]
    fn test_challenge_waits_for_async_callback() {
        let auth = ScriptedAuthenticator::succeeding().delayed(Duration::from_millis(50));
        let gate = PresenceGate::new(&auth, AuthPolicy::DeviceOwnerBiometrics);

        assert_eq!(gate.challenge("access the password for k"), AuthOutcome::Success);
        assert_eq!(auth.challenges(), 1);
    }

    #[test]
    fn test_challenge_sends_reason_and_zero_reuse() {
        let auth = ScriptedAuthenticator::succeeding();
        let gate = PresenceGate::new(&auth, AuthPolicy::DeviceOwnerBiometrics);
        gate.challenge("delete the password for api-token");

        let requests = auth.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].reason, "delete the password for api-token");
        assert_eq!(requests[0].reuse_window, Duration::ZERO);
        assert_eq!(requests[0].policy, AuthPolicy::DeviceOwnerBiometrics);
    }

    #[test]
    fn test_every_challenge_reaches_the_platform() {
        let auth = ScriptedAuthenticator::succeeding();
        let gate = PresenceGate::new(&auth, AuthPolicy::DeviceOwnerBiometrics);
        gate.challenge("a");
        gate.challenge("b");
        assert_eq!(auth.challenges(), 2);
    }

    #[test]
    fn test_cancellation_is_failure() {
        let auth = ScriptedAuthenticator::failing("user cancelled");
        let gate = PresenceGate::new(&auth, AuthPolicy::DeviceOwnerBiometrics);
        assert_eq!(
            gate.challenge("r"),
            AuthOutcome::Failure("user cancelled".to_string())
        );
    }

    #[test]
    fn test_unavailable_skips_challenge() {
        let auth = ScriptedAuthenticator::unavailable("no fingerprint reader found");
        let gate = PresenceGate::new(&auth, AuthPolicy::DeviceOwnerBiometrics);

        assert_eq!(
            gate.challenge("r"),
            AuthOutcome::Unavailable("no fingerprint reader found".to_string())
        );
        assert_eq!(auth.challenges(), 0);
    }

    #[test]
    fn test_dropped_completion_is_failure() {
        let auth = ScriptedAuthenticator::dropping();
        let gate = PresenceGate::new(&auth, AuthPolicy::DeviceOwnerBiometrics);
        assert!(matches!(gate.challenge("r"), AuthOutcome::Failure(_)));
    }

    #[test]
    fn test_disabled_authenticator() {
        let gate = PresenceGate::new(
            platform_authenticator(AuthenticatorKind::Disabled),
            AuthPolicy::DeviceOwnerBiometrics,
        );
        assert!(gate.check_availability().is_err());
        assert!(matches!(gate.challenge("r"), AuthOutcome::Unavailable(_)));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_touch_id_off_macos_is_unavailable() {
        let gate = PresenceGate::new(
            platform_authenticator(AuthenticatorKind::TouchId),
            AuthPolicy::DeviceOwnerBiometrics,
        );
        match gate.challenge("access the password for k") {
            AuthOutcome::Unavailable(why) => assert!(why.contains("only available on macOS")),
            other => panic!("Expected Unavailable, got {:?}", other),
        }
    }
}
