//! Test doubles for the two collaborators

use crate::gate::{AuthPolicy, Authenticator, Completion, EvaluationRequest};
use crate::store::{SecretStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use zeroize::Zeroizing;

/// Authenticator that answers every challenge the same way, from a
/// separate thread like a real platform callback
pub struct ScriptedAuthenticator {
    availability: Result<(), String>,
    /// `None` drops the completion without calling it
    response: Option<(bool, Option<String>)>,
    delay: Duration,
    requests: Mutex<Vec<EvaluationRequest>>,
}

impl ScriptedAuthenticator {
    fn new(availability: Result<(), String>, response: Option<(bool, Option<String>)>) -> Self {
        Self {
            availability,
            response,
            delay: Duration::ZERO,
            requests: Mutex::new(vec![]),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Ok(()), Some((true, None)))
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(Ok(()), Some((false, Some(reason.to_string()))))
    }

    pub fn unavailable(reason: &str) -> Self {
        Self::new(Err(reason.to_string()), Some((true, None)))
    }

    pub fn dropping() -> Self {
        Self::new(Ok(()), None)
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn challenges(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<EvaluationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Authenticator for ScriptedAuthenticator {
    fn policy_available(&self, _policy: AuthPolicy) -> Result<(), String> {
        self.availability.clone()
    }

    fn evaluate(&self, request: EvaluationRequest, completion: Completion) {
        self.requests.lock().unwrap().push(request);

        match self.response.clone() {
            Some((success, error)) => {
                let delay = self.delay;
                thread::spawn(move || {
                    thread::sleep(delay);
                    completion(success, error);
                });
            }
            None => drop(completion),
        }
    }
}

/// In-memory store that records every call made to it
#[derive(Default)]
pub struct RecordingStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    broken: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose engine fails every call
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn with_record(self, key: &str, value: &[u8]) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str, key: &str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(format!("{}:{}", call, key));
        if self.broken {
            return Err(StoreError::Engine("storage engine offline".to_string()));
        }
        Ok(())
    }
}

impl SecretStore for RecordingStore {
    fn insert_if_absent(&self, key: &str, secret: &[u8]) -> Result<(), StoreError> {
        self.record("insert_if_absent", key)?;
        let mut records = self.records.lock().unwrap();
        if records.contains_key(key) {
            return Err(StoreError::Duplicate(key.to_string()));
        }
        records.insert(key.to_string(), secret.to_vec());
        Ok(())
    }

    fn find_one(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError> {
        self.record("find_one", key)?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(key)
            .map(|value| Zeroizing::new(value.clone())))
    }

    fn delete_one(&self, key: &str) -> Result<(), StoreError> {
        self.record("delete_one", key)?;
        match self.records.lock().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }
}
