//! Admission decision engine.
//!
//! Turns a moderator action plus the "remember choice" toggle into a
//! concrete [`Decision`]: the users affected, the admission status, and an
//! optional default policy for future arrivals.
//!
//! The engine is a pure function of its inputs. It never re-queries the
//! registry, never holds state between calls, and never talks to the
//! backend. Applying a decision is the job of
//! [`AdmissionService`](crate::admission::AdmissionService).
//!
//! # Batch Action Catalog
//!
//! | key | offered when | targets | status | remembered policy |
//! |-----|--------------|---------|--------|-------------------|
//! | `allow-all-auth` | authenticated guest mode | authenticated | ALLOW | `ALWAYS_ACCEPT_AUTH` |
//! | `allow-all-guest` | authenticated guest mode | guest (+ authenticated if remembered) | ALLOW | `ALWAYS_ACCEPT` |
//! | `allow-everyone` | always | guest + authenticated | ALLOW | `ALWAYS_ACCEPT` |
//! | `deny-everyone` | always | guest + authenticated | DENY | `ALWAYS_DENY` |
//!
//! Single-user accept/deny never writes a policy.

use crate::errors::WaitingRoomError;
use crate::types::{AdmissionDecision, AdmissionStatus, GuestPolicy, PendingQueues, PendingUser, SessionFlags};
use common::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Named bulk options offered to the moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchAction {
    AllowAllAuth,
    AllowAllGuest,
    AllowEveryone,
    DenyEveryone,
}

impl BatchAction {
    /// Every batch action, in the order the panel lists them.
    pub const ALL: [BatchAction; 4] = [
        BatchAction::AllowAllAuth,
        BatchAction::AllowAllGuest,
        BatchAction::AllowEveryone,
        BatchAction::DenyEveryone,
    ];

    /// Stable key of the action.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            BatchAction::AllowAllAuth => "allow-all-auth",
            BatchAction::AllowAllGuest => "allow-all-guest",
            BatchAction::AllowEveryone => "allow-everyone",
            BatchAction::DenyEveryone => "deny-everyone",
        }
    }

    #[must_use]
    pub fn status(self) -> AdmissionStatus {
        match self {
            BatchAction::DenyEveryone => AdmissionStatus::Deny,
            _ => AdmissionStatus::Allow,
        }
    }

    /// Policy persisted when the moderator asks to remember the choice.
    #[must_use]
    pub fn remembered_policy(self) -> GuestPolicy {
        match self {
            BatchAction::AllowAllAuth => GuestPolicy::AlwaysAcceptAuth,
            BatchAction::AllowAllGuest | BatchAction::AllowEveryone => GuestPolicy::AlwaysAccept,
            BatchAction::DenyEveryone => GuestPolicy::AlwaysDeny,
        }
    }

    /// Whether the action is only offered in authenticated guest mode.
    #[must_use]
    pub fn requires_authenticated_guest_mode(self) -> bool {
        matches!(self, BatchAction::AllowAllAuth | BatchAction::AllowAllGuest)
    }

    /// Whether the action is offered under the given flags.
    #[must_use]
    pub fn is_offered(self, flags: &SessionFlags) -> bool {
        !self.requires_authenticated_guest_mode() || flags.authenticated_guest_mode_enabled
    }
}

impl fmt::Display for BatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BatchAction {
    type Err = WaitingRoomError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        BatchAction::ALL
            .into_iter()
            .find(|action| action.key() == key)
            .ok_or_else(|| WaitingRoomError::InvalidAction(format!("unknown batch action: {key}")))
    }
}

/// A moderator action: one of the batch options or a per-row button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "kebab-case")]
pub enum Action {
    Batch(BatchAction),
    AcceptOne(UserId),
    DenyOne(UserId),
}

impl Action {
    /// Bounded label for logs and metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Action::Batch(action) => action.key(),
            Action::AcceptOne(_) => "accept-one",
            Action::DenyOne(_) => "deny-one",
        }
    }

    #[must_use]
    pub fn is_batch(&self) -> bool {
        matches!(self, Action::Batch(_))
    }
}

impl From<BatchAction> for Action {
    fn from(action: BatchAction) -> Self {
        Action::Batch(action)
    }
}

/// Effect of a moderator action, before it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Default policy to persist, if the choice is remembered.
    pub policy_update: Option<GuestPolicy>,
    pub admission: AdmissionDecision,
}

/// Batch actions offered under the given flags, in panel order.
#[must_use]
pub fn available_actions(flags: &SessionFlags) -> Vec<BatchAction> {
    BatchAction::ALL
        .into_iter()
        .filter(|action| action.is_offered(flags))
        .collect()
}

/// Compute the effect of a moderator action against a queue snapshot.
///
/// `remember_choice` is ignored for single-user actions.
///
/// # Errors
///
/// - `WaitingRoomError::InvalidAction` if the batch action is not offered
///   under `flags`, or the choice is remembered while the toggle is not
///   offered.
/// - `WaitingRoomError::UserNotPending` if a single-user action targets a
///   user absent from `queues`.
pub fn decide(
    action: &Action,
    remember_choice: bool,
    flags: &SessionFlags,
    queues: &PendingQueues,
) -> Result<Decision, WaitingRoomError> {
    let decision = match action {
        Action::Batch(batch) => decide_batch(*batch, remember_choice, flags, queues)?,
        Action::AcceptOne(user_id) => decide_single(user_id, AdmissionStatus::Allow, queues)?,
        Action::DenyOne(user_id) => decide_single(user_id, AdmissionStatus::Deny, queues)?,
    };

    debug!(
        target: "wr.engine",
        action = action.label(),
        remember_choice,
        targets = decision.admission.len(),
        status = decision.admission.status.as_str(),
        policy_update = ?decision.policy_update,
        "Decision computed"
    );

    Ok(decision)
}

fn decide_batch(
    action: BatchAction,
    remember_choice: bool,
    flags: &SessionFlags,
    queues: &PendingQueues,
) -> Result<Decision, WaitingRoomError> {
    if !action.is_offered(flags) {
        return Err(WaitingRoomError::InvalidAction(format!(
            "{action} requires authenticated guest mode"
        )));
    }
    if remember_choice && !flags.allow_remember_choice {
        return Err(WaitingRoomError::InvalidAction(format!(
            "{action} remembered while remember choice is not offered"
        )));
    }

    let guests = queues.guest.iter();
    let authenticated = queues.authenticated.iter();
    let target_user_ids = match action {
        BatchAction::AllowAllAuth => unique_ids(authenticated),
        // Remembering ALWAYS_ACCEPT would admit the pending authenticated
        // users anyway, so they join this batch.
        BatchAction::AllowAllGuest if remember_choice => unique_ids(guests.chain(authenticated)),
        BatchAction::AllowAllGuest => unique_ids(guests),
        BatchAction::AllowEveryone | BatchAction::DenyEveryone => {
            unique_ids(guests.chain(authenticated))
        }
    };

    Ok(Decision {
        policy_update: remember_choice.then(|| action.remembered_policy()),
        admission: AdmissionDecision {
            target_user_ids,
            status: action.status(),
        },
    })
}

fn decide_single(
    user_id: &UserId,
    status: AdmissionStatus,
    queues: &PendingQueues,
) -> Result<Decision, WaitingRoomError> {
    let user = queues
        .find(user_id)
        .ok_or_else(|| WaitingRoomError::UserNotPending(user_id.clone()))?;

    Ok(Decision {
        policy_update: None,
        admission: AdmissionDecision {
            target_user_ids: vec![user.id.clone()],
            status,
        },
    })
}

/// Collect ids in iteration order, keeping the first occurrence.
fn unique_ids<'a>(users: impl Iterator<Item = &'a PendingUser>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    users
        .filter(|user| seen.insert(&user.id))
        .map(|user| user.id.clone())
        .collect()
}
