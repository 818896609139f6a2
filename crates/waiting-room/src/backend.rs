//! Session backend seams.
//!
//! The backend applies admission decisions and stores the default policy.
//! The wire protocol is owned by the surrounding system; this module only
//! defines the traits the waiting room calls through.
//!
//! Two shapes are supported:
//! - [`AdmissionBackend`]: one request per batch decision.
//! - [`PerUserTransport`]: one request per user. Wrap it in
//!   [`PerUserBatchAdapter`] to present one logical batch, which only
//!   reports success once every per-user call succeeded.

use crate::errors::BackendError;
use crate::types::{AdmissionDecision, AdmissionStatus, GuestPolicy};
use common::types::UserId;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Result of applying one batch decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchApplyOutcome {
    /// Every target was processed.
    Applied,
    /// Some targets were not processed.
    Partial { failed_user_ids: Vec<UserId> },
    /// No target was processed.
    Failed { reason: String },
}

impl BatchApplyOutcome {
    /// Bounded label for metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            BatchApplyOutcome::Applied => "applied",
            BatchApplyOutcome::Partial { .. } => "partial",
            BatchApplyOutcome::Failed { .. } => "failed",
        }
    }
}

/// Backend operations used by the admission service.
#[async_trait::async_trait]
pub trait AdmissionBackend: Send + Sync {
    /// Apply one batch decision as a single request.
    ///
    /// The caller stops waiting at `deadline` and counts an unanswered batch
    /// as failed. Implementations that make progress target by target must
    /// return before then, reporting unconfirmed targets as failed.
    async fn apply_batch_decision(
        &self,
        decision: &AdmissionDecision,
        deadline: Instant,
    ) -> BatchApplyOutcome;

    /// Persist the default policy. `None` restores "ask the moderator".
    async fn set_default_policy(&self, policy: Option<GuestPolicy>) -> Result<(), BackendError>;

    /// Publish the message shown to waiting users. Empty clears it.
    async fn set_lobby_message(&self, message: &str) -> Result<(), BackendError>;
}

/// A transport that can only address one user per call.
#[async_trait::async_trait]
pub trait PerUserTransport: Send + Sync {
    async fn apply_user_decision(
        &self,
        user_id: &UserId,
        status: AdmissionStatus,
    ) -> Result<(), BackendError>;

    async fn set_default_policy(&self, policy: Option<GuestPolicy>) -> Result<(), BackendError>;

    async fn set_lobby_message(&self, message: &str) -> Result<(), BackendError>;
}

/// Presents a [`PerUserTransport`] as an [`AdmissionBackend`].
///
/// Issues the per-user calls in order and aggregates the results into one
/// outcome. A call still running at the deadline is abandoned, and users not
/// reached by then are not contacted; both count as failed.
#[derive(Debug)]
pub struct PerUserBatchAdapter<T> {
    transport: T,
}

impl<T: PerUserTransport> PerUserBatchAdapter<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait::async_trait]
impl<T: PerUserTransport> AdmissionBackend for PerUserBatchAdapter<T> {
    #[instrument(skip_all, name = "wr.backend.per_user_batch", fields(targets = decision.len(), status = decision.status.as_str()))]
    async fn apply_batch_decision(
        &self,
        decision: &AdmissionDecision,
        deadline: Instant,
    ) -> BatchApplyOutcome {
        let started = Instant::now();
        let mut failed_user_ids = Vec::new();
        let mut last_error = None;
        let mut unreached = 0usize;

        for user_id in &decision.target_user_ids {
            if Instant::now() >= deadline {
                failed_user_ids.push(user_id.clone());
                unreached += 1;
                continue;
            }

            let result = tokio::time::timeout_at(
                deadline,
                self.transport.apply_user_decision(user_id, decision.status),
            )
            .await
            .unwrap_or_else(|_| {
                Err(BackendError::Timeout(
                    deadline.saturating_duration_since(started),
                ))
            });

            if let Err(e) = result {
                warn!(
                    target: "wr.backend",
                    user_id = %user_id,
                    error = %e,
                    "Per-user decision failed"
                );
                failed_user_ids.push(user_id.clone());
                last_error = Some(e);
            }
        }

        if unreached > 0 {
            warn!(
                target: "wr.backend",
                unreached,
                "Deadline reached before every user was contacted"
            );
            if last_error.is_none() {
                last_error = Some(BackendError::Timeout(
                    deadline.saturating_duration_since(started),
                ));
            }
        }

        match last_error {
            None => {
                debug!(target: "wr.backend", "All per-user decisions applied");
                BatchApplyOutcome::Applied
            }
            Some(e) if failed_user_ids.len() == decision.len() => BatchApplyOutcome::Failed {
                reason: e.to_string(),
            },
            Some(_) => BatchApplyOutcome::Partial { failed_user_ids },
        }
    }

    async fn set_default_policy(&self, policy: Option<GuestPolicy>) -> Result<(), BackendError> {
        self.transport.set_default_policy(policy).await
    }

    async fn set_lobby_message(&self, message: &str) -> Result<(), BackendError> {
        self.transport.set_lobby_message(message).await
    }
}
