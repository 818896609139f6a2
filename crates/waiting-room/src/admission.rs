//! Admission service: applies engine decisions against the backend.
//!
//! One call to [`AdmissionService::decide`] is one logical operation:
//!
//! 1. Take an owned snapshot of the registry and run the pure engine.
//!    Contract violations are rejected here, before any backend call.
//! 2. If the choice is remembered, send the default policy first, so
//!    users arriving during the batch are evaluated under it.
//! 3. Dispatch the batch decision as a single request.
//! 4. If the batch failed outright, revert the policy to its previous value.
//!    A policy write that failed or timed out may still have been stored,
//!    so it is reverted too. Otherwise commit it to the locally observable
//!    policy.
//!
//! Operations are serialized, so no caller sees a half-applied action.
//! Policy persistence and batch application are separate failure domains:
//! a failed policy write is reported as a warning and the batch proceeds.

use crate::backend::{AdmissionBackend, BatchApplyOutcome};
use crate::config::Config;
use crate::engine::{self, Action};
use crate::errors::{BackendError, WaitingRoomError};
use crate::lifecycle::PanelLayout;
use crate::observability::metrics::{
    record_batch_apply, record_decision, record_panel_close, record_policy_update,
    record_rejected_action,
};
use crate::registry::RegistryReceiver;
use crate::types::{policy_label, AdmissionDecision, GuestPolicy};
use crate::view::PanelView;
use common::types::MeetingId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// What happened to the default policy during an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyChange {
    /// No policy was requested.
    Unchanged,
    /// The policy was persisted and committed.
    Applied(GuestPolicy),
    /// The backend refused or did not answer; the previous policy stands.
    Failed { policy: GuestPolicy, reason: String },
}

/// Result of a fully or mostly successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionReport {
    pub decision: AdmissionDecision,
    pub policy: PolicyChange,
    /// `false` when the target set was empty and no batch was sent.
    pub dispatched: bool,
}

impl AdmissionReport {
    /// Warning to surface when the policy could not be remembered.
    #[must_use]
    pub fn policy_warning(&self) -> Option<WaitingRoomError> {
        match &self.policy {
            PolicyChange::Failed { policy, reason } => Some(WaitingRoomError::PolicyApplyFailed {
                policy: *policy,
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

/// Applies moderator actions for one meeting.
pub struct AdmissionService {
    meeting_id: MeetingId,
    receiver: RegistryReceiver,
    backend: Arc<dyn AdmissionBackend>,
    layout: Arc<dyn PanelLayout>,
    config: Config,
    /// Serializes apply sequences.
    apply_lock: Mutex<()>,
    /// Committed default policy. Single writer: this service.
    policy: watch::Sender<Option<GuestPolicy>>,
}

impl AdmissionService {
    /// Create a service.
    ///
    /// `initial_policy` is the policy currently stored by the backend
    /// (`None` = ask the moderator).
    #[must_use]
    pub fn new(
        meeting_id: MeetingId,
        receiver: RegistryReceiver,
        backend: Arc<dyn AdmissionBackend>,
        layout: Arc<dyn PanelLayout>,
        config: Config,
        initial_policy: Option<GuestPolicy>,
    ) -> Self {
        let (policy, _) = watch::channel(initial_policy);
        Self {
            meeting_id,
            receiver,
            backend,
            layout,
            config,
            apply_lock: Mutex::new(()),
            policy,
        }
    }

    #[must_use]
    pub fn meeting_id(&self) -> MeetingId {
        self.meeting_id
    }

    /// Committed default policy.
    #[must_use]
    pub fn current_policy(&self) -> Option<GuestPolicy> {
        *self.policy.borrow()
    }

    /// Observe committed policy changes.
    #[must_use]
    pub fn subscribe_policy(&self) -> watch::Receiver<Option<GuestPolicy>> {
        self.policy.subscribe()
    }

    /// Panel contents for the current snapshot.
    #[must_use]
    pub fn panel_view(&self) -> PanelView {
        PanelView::from_snapshot(&self.receiver.snapshot())
    }

    /// Compute and apply a moderator action.
    ///
    /// # Errors
    ///
    /// - `InvalidAction` / `UserNotPending`: rejected locally, nothing sent.
    /// - `BatchApplyPartialFailure`: some targets failed; the policy, if any,
    ///   stays applied.
    /// - `BatchApplyFailure`: no target was processed; a policy sent for this
    ///   action, confirmed or not, has been reverted (`policy_reverted`).
    #[instrument(
        skip_all,
        name = "wr.admission.decide",
        fields(meeting_id = %self.meeting_id, action = action.label(), remember_choice = remember_choice)
    )]
    pub async fn decide(
        &self,
        action: Action,
        remember_choice: bool,
    ) -> Result<AdmissionReport, WaitingRoomError> {
        let _guard = self.apply_lock.lock().await;

        let snapshot = self.receiver.snapshot();
        let decision = engine::decide(&action, remember_choice, &snapshot.flags, &snapshot.queues)
            .map_err(|e| {
                warn!(target: "wr.admission", error = %e, "Action rejected");
                record_rejected_action(rejection_reason(&e));
                e
            })?;
        record_decision(action.label(), decision.admission.status.as_str());

        let previous_policy = self.current_policy();
        let policy = match decision.policy_update {
            None => PolicyChange::Unchanged,
            Some(policy) => self.send_policy(policy).await,
        };

        let started = Instant::now();
        let outcome = if decision.admission.is_empty() {
            debug!(target: "wr.admission", "No pending targets, skipping batch dispatch");
            record_batch_apply("skipped", Duration::ZERO);
            None
        } else {
            let outcome = self.dispatch(&decision.admission).await;
            record_batch_apply(outcome.label(), started.elapsed());
            Some(outcome)
        };
        let dispatched = outcome.is_some();

        match outcome {
            Some(BatchApplyOutcome::Failed { reason }) => {
                error!(
                    target: "wr.admission",
                    reason = %reason,
                    targets = decision.admission.len(),
                    "Batch decision failed"
                );
                let policy_reverted = match policy {
                    PolicyChange::Applied(_) | PolicyChange::Failed { .. } => {
                        self.revert_policy(previous_policy).await
                    }
                    PolicyChange::Unchanged => false,
                };
                Err(WaitingRoomError::BatchApplyFailure {
                    reason,
                    policy_reverted,
                })
            }
            Some(BatchApplyOutcome::Partial { failed_user_ids }) => {
                warn!(
                    target: "wr.admission",
                    failed = failed_user_ids.len(),
                    targets = decision.admission.len(),
                    "Batch decision partially applied"
                );
                self.commit_policy(&policy);
                Err(WaitingRoomError::BatchApplyPartialFailure {
                    status: decision.admission.status,
                    failed_user_ids,
                })
            }
            Some(BatchApplyOutcome::Applied) | None => {
                self.commit_policy(&policy);
                if action.is_batch() && self.config.close_panel_on_batch {
                    self.layout.close_panel();
                    record_panel_close("batch_action");
                }
                info!(
                    target: "wr.admission",
                    targets = decision.admission.len(),
                    status = decision.admission.status.as_str(),
                    "Admission decision applied"
                );
                Ok(AdmissionReport {
                    dispatched,
                    decision: decision.admission,
                    policy,
                })
            }
        }
    }

    /// Publish the message shown to waiting users.
    ///
    /// The text is trimmed; an empty message clears it. Returns the message
    /// as sent.
    ///
    /// # Errors
    ///
    /// - `InvalidAction` if the lobby message feature is disabled.
    /// - `InvalidLobbyMessage` if the text is longer than the configured limit.
    /// - `Backend` if the backend call failed or timed out.
    #[instrument(skip_all, name = "wr.admission.lobby_message", fields(meeting_id = %self.meeting_id))]
    pub async fn set_lobby_message(&self, text: &str) -> Result<String, WaitingRoomError> {
        if !self.receiver.snapshot().flags.lobby_message_feature_enabled {
            record_rejected_action("invalid_action");
            return Err(WaitingRoomError::InvalidAction(
                "lobby message feature is disabled".to_string(),
            ));
        }

        let message = text.trim();
        let max = self.config.lobby_message_max_chars;
        if message.chars().count() > max {
            record_rejected_action("invalid_lobby_message");
            return Err(WaitingRoomError::InvalidLobbyMessage(format!(
                "Message must be at most {max} characters"
            )));
        }

        self.with_timeout(self.backend.set_lobby_message(message))
            .await
            .map_err(|e| {
                warn!(target: "wr.admission", error = %e, "Failed to set lobby message");
                WaitingRoomError::from(e)
            })?;

        debug!(target: "wr.admission", chars = message.chars().count(), "Lobby message updated");
        Ok(message.to_string())
    }

    async fn send_policy(&self, policy: GuestPolicy) -> PolicyChange {
        match self
            .with_timeout(self.backend.set_default_policy(Some(policy)))
            .await
        {
            Ok(()) => {
                record_policy_update(policy.as_str(), "applied");
                PolicyChange::Applied(policy)
            }
            Err(e) => {
                warn!(
                    target: "wr.admission",
                    policy = policy.as_str(),
                    error = %e,
                    "Failed to apply default policy, continuing with batch"
                );
                record_policy_update(policy.as_str(), "failed");
                PolicyChange::Failed {
                    policy,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Compensating write after a failed batch. Returns whether it succeeded.
    async fn revert_policy(&self, previous: Option<GuestPolicy>) -> bool {
        match self.with_timeout(self.backend.set_default_policy(previous)).await {
            Ok(()) => {
                info!(
                    target: "wr.admission",
                    policy = policy_label(previous),
                    "Default policy reverted"
                );
                record_policy_update(policy_label(previous), "reverted");
                true
            }
            Err(e) => {
                error!(
                    target: "wr.admission",
                    policy = policy_label(previous),
                    error = %e,
                    "Failed to revert default policy"
                );
                record_policy_update(policy_label(previous), "revert_failed");
                false
            }
        }
    }

    fn commit_policy(&self, change: &PolicyChange) {
        if let PolicyChange::Applied(policy) = change {
            self.policy.send_replace(Some(*policy));
        }
    }

    async fn dispatch(&self, decision: &AdmissionDecision) -> BatchApplyOutcome {
        let timeout = self.config.backend_timeout;
        let deadline = Instant::now() + timeout;
        tokio::time::timeout_at(deadline, self.backend.apply_batch_decision(decision, deadline))
            .await
            .unwrap_or_else(|_| BatchApplyOutcome::Failed {
                reason: BackendError::Timeout(timeout).to_string(),
            })
    }

    async fn with_timeout<T>(
        &self,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, BackendError> {
        let timeout = self.config.backend_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .unwrap_or_else(|_| Err(BackendError::Timeout(timeout)))
    }
}

fn rejection_reason(err: &WaitingRoomError) -> &'static str {
    match err {
        WaitingRoomError::UserNotPending(_) => "user_not_pending",
        _ => "invalid_action",
    }
}
