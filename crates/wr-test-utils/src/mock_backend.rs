//! Mock session backends.
//!
//! [`MockAdmissionBackend`] can be configured to:
//! - Fail default policy writes (all of them, or only the first)
//! - Store a policy but answer late, as a backend behind a slow link does
//! - Return scripted batch outcomes in sequence
//! - Delay every call, for timeout and serialization tests
//!
//! Every call is recorded as a [`BackendCall`] in arrival order, and the
//! policy the backend would currently enforce is tracked separately.
//!
//! # Example
//!
//! ```rust,ignore
//! use wr_test_utils::MockAdmissionBackend;
//!
//! let backend = MockAdmissionBackend::builder()
//!     .with_batch_outcomes(vec![BatchApplyOutcome::Failed { reason: "down".into() }])
//!     .build();
//! ```

use async_trait::async_trait;
use common::types::UserId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use waiting_room::backend::{AdmissionBackend, BatchApplyOutcome, PerUserTransport};
use waiting_room::errors::BackendError;
use tokio::time::Instant;
use waiting_room::types::{AdmissionDecision, AdmissionStatus, GuestPolicy};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Batch(AdmissionDecision),
    Policy(Option<GuestPolicy>),
    LobbyMessage(String),
}

/// Mock admission backend for testing the admission service.
#[derive(Debug, Default)]
pub struct MockAdmissionBackend {
    calls: Mutex<Vec<BackendCall>>,
    /// Outcomes to return (cycles through them). Empty means `Applied`.
    batch_outcomes: Vec<BatchApplyOutcome>,
    batch_count: AtomicUsize,
    policy_failures_remaining: AtomicUsize,
    /// Policy stored by accepted writes, whether or not the answer arrived.
    stored_policy: Mutex<Option<GuestPolicy>>,
    slow_policy_writes_remaining: AtomicUsize,
    slow_policy_delay: Duration,
    fail_lobby_message: bool,
    delay: Option<Duration>,
}

impl MockAdmissionBackend {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> MockAdmissionBackendBuilder {
        MockAdmissionBackendBuilder::default()
    }

    /// Create a mock that accepts everything.
    #[must_use]
    pub fn accepting() -> Self {
        Self::default()
    }

    /// All recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Total number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Recorded batch decisions.
    #[must_use]
    pub fn batches(&self) -> Vec<AdmissionDecision> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Batch(decision) => Some(decision),
                _ => None,
            })
            .collect()
    }

    /// Recorded policy writes, including reverts.
    #[must_use]
    pub fn policy_writes(&self) -> Vec<Option<GuestPolicy>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Policy(policy) => Some(policy),
                _ => None,
            })
            .collect()
    }

    /// Policy the backend currently enforces (`None` = ask the moderator).
    #[must_use]
    pub fn stored_policy(&self) -> Option<GuestPolicy> {
        *self.stored_policy.lock().unwrap()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AdmissionBackend for MockAdmissionBackend {
    async fn apply_batch_decision(
        &self,
        decision: &AdmissionDecision,
        _deadline: Instant,
    ) -> BatchApplyOutcome {
        self.record(BackendCall::Batch(decision.clone()));
        self.pause().await;

        let count = self.batch_count.fetch_add(1, Ordering::SeqCst);
        if self.batch_outcomes.is_empty() {
            return BatchApplyOutcome::Applied;
        }
        self.batch_outcomes[count % self.batch_outcomes.len()].clone()
    }

    async fn set_default_policy(&self, policy: Option<GuestPolicy>) -> Result<(), BackendError> {
        self.record(BackendCall::Policy(policy));

        let failing = take_one(&self.policy_failures_remaining);
        if !failing {
            *self.stored_policy.lock().unwrap() = policy;
        }

        if take_one(&self.slow_policy_writes_remaining) {
            tokio::time::sleep(self.slow_policy_delay).await;
        } else {
            self.pause().await;
        }

        if failing {
            Err(BackendError::Rejected("mock policy write refused".to_string()))
        } else {
            Ok(())
        }
    }

    async fn set_lobby_message(&self, message: &str) -> Result<(), BackendError> {
        self.record(BackendCall::LobbyMessage(message.to_string()));
        self.pause().await;

        if self.fail_lobby_message {
            Err(BackendError::Unavailable("mock backend unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Decrement `counter` if positive. Returns whether it was.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Builder for [`MockAdmissionBackend`].
#[derive(Debug, Default)]
pub struct MockAdmissionBackendBuilder {
    batch_outcomes: Vec<BatchApplyOutcome>,
    policy_failures: usize,
    slow_policy_writes: usize,
    slow_policy_delay: Duration,
    fail_lobby_message: bool,
    delay: Option<Duration>,
}

impl MockAdmissionBackendBuilder {
    /// Return these outcomes for successive batches, cycling.
    #[must_use]
    pub fn with_batch_outcomes(mut self, outcomes: Vec<BatchApplyOutcome>) -> Self {
        self.batch_outcomes = outcomes;
        self
    }

    /// Fail every batch outright.
    #[must_use]
    pub fn fail_batches(self, reason: impl Into<String>) -> Self {
        self.with_batch_outcomes(vec![BatchApplyOutcome::Failed {
            reason: reason.into(),
        }])
    }

    /// Refuse every policy write.
    #[must_use]
    pub fn fail_policy_updates(mut self) -> Self {
        self.policy_failures = usize::MAX;
        self
    }

    /// Refuse only the first `count` policy writes.
    #[must_use]
    pub fn fail_first_policy_updates(mut self, count: usize) -> Self {
        self.policy_failures = count;
        self
    }

    /// Store the first `count` policy writes at once but answer only after
    /// `delay`.
    #[must_use]
    pub fn slow_first_policy_updates(mut self, count: usize, delay: Duration) -> Self {
        self.slow_policy_writes = count;
        self.slow_policy_delay = delay;
        self
    }

    /// Fail lobby message updates.
    #[must_use]
    pub fn fail_lobby_message(mut self) -> Self {
        self.fail_lobby_message = true;
        self
    }

    /// Sleep before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn build(self) -> MockAdmissionBackend {
        MockAdmissionBackend {
            calls: Mutex::new(Vec::new()),
            batch_outcomes: self.batch_outcomes,
            batch_count: AtomicUsize::new(0),
            policy_failures_remaining: AtomicUsize::new(self.policy_failures),
            stored_policy: Mutex::new(None),
            slow_policy_writes_remaining: AtomicUsize::new(self.slow_policy_writes),
            slow_policy_delay: self.slow_policy_delay,
            fail_lobby_message: self.fail_lobby_message,
            delay: self.delay,
        }
    }
}

/// Mock per-user transport that fails for a fixed set of users.
#[derive(Debug, Default)]
pub struct MockPerUserTransport {
    failing: HashSet<UserId>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(UserId, AdmissionStatus)>>,
    applied: Mutex<Vec<UserId>>,
}

impl MockPerUserTransport {
    /// Create a transport that accepts every user.
    #[must_use]
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Create a transport that fails for the given users.
    #[must_use]
    pub fn failing_for(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| UserId::new(*id)).collect(),
            ..Self::default()
        }
    }

    /// Sleep before answering each per-user call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Users whose call completed successfully, in order.
    #[must_use]
    pub fn applied(&self) -> Vec<UserId> {
        self.applied.lock().unwrap().clone()
    }

    /// Per-user calls made, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(UserId, AdmissionStatus)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PerUserTransport for MockPerUserTransport {
    async fn apply_user_decision(
        &self,
        user_id: &UserId,
        status: AdmissionStatus,
    ) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push((user_id.clone(), status));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(user_id) {
            return Err(BackendError::Unavailable(format!("no route to {user_id}")));
        }
        self.applied.lock().unwrap().push(user_id.clone());
        Ok(())
    }

    async fn set_default_policy(&self, _policy: Option<GuestPolicy>) -> Result<(), BackendError> {
        Ok(())
    }

    async fn set_lobby_message(&self, _message: &str) -> Result<(), BackendError> {
        Ok(())
    }
}
