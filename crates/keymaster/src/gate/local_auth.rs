//! macOS authenticator backed by LocalAuthentication
//!
//! One `LAContext` per challenge, evaluating
//! `deviceOwnerAuthenticationWithBiometrics` with Touch ID reuse disabled.
//! The reply block runs on a system queue and forwards into the gate's
//! completion handler.

use super::{AuthPolicy, Authenticator, Completion, EvaluationRequest};
use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::Bool;
use objc2_foundation::{NSError, NSString};
use objc2_local_authentication::{LAContext, LAPolicy};
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
pub struct LocalAuthenticator;

impl LocalAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

fn la_policy(policy: AuthPolicy) -> LAPolicy {
    match policy {
        AuthPolicy::DeviceOwnerBiometrics => LAPolicy::DeviceOwnerAuthenticationWithBiometrics,
    }
}

fn context(reuse_seconds: f64) -> Retained<LAContext> {
    let context = unsafe { LAContext::new() };
    unsafe { context.setTouchIDAuthenticationAllowableReuseDuration(reuse_seconds) };
    context
}

impl Authenticator for LocalAuthenticator {
    fn policy_available(&self, policy: AuthPolicy) -> Result<(), String> {
        let context = context(policy.reuse_window().as_secs_f64());
        unsafe { context.canEvaluatePolicy_error(la_policy(policy)) }
            .map_err(|error| error.localizedDescription().to_string())
    }

    fn evaluate(&self, request: EvaluationRequest, completion: Completion) {
        let context = context(request.reuse_window.as_secs_f64());
        let reason = NSString::from_str(&request.reason);
        debug!(policy = request.policy.name(), "evaluating LocalAuthentication policy");

        // The reply block is `Fn`; the slot makes sure the completion runs once.
        let slot = Mutex::new(Some(completion));
        let keep_alive = context.clone();
        let reply = RcBlock::new(move |success: Bool, error: *mut NSError| {
            let _context = &keep_alive;
            let description = unsafe { error.as_ref() }
                .map(|error| error.localizedDescription().to_string());
            let completion = slot.lock().ok().and_then(|mut slot| slot.take());
            if let Some(completion) = completion {
                completion(success.as_bool(), description);
            }
        });

        unsafe {
            context.evaluatePolicy_localizedReason_reply(
                la_policy(request.policy),
                &reason,
                &reply,
            )
        };
    }
}
