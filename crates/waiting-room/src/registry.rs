//! Pending-user registry with change notification.
//!
//! The presence service owns the queues; it pushes updates through a
//! [`RegistryHandle`]. Consumers hold a [`RegistryReceiver`] and take owned
//! snapshots, so no operation keeps a reference into a prior state.
//!
//! Backed by `tokio::sync::watch`: receivers always see the latest value and
//! are only woken when the snapshot actually changes.

use crate::errors::WaitingRoomError;
use crate::types::{AdmissionDecision, PendingQueues, PendingUser, SessionFlags};
use common::types::UserId;
use tokio::sync::watch;
use tracing::debug;

/// Everything the waiting room reads from outside: both queues and flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitingRoomSnapshot {
    pub queues: PendingQueues,
    pub flags: SessionFlags,
}

/// Create a registry seeded with `initial`.
#[must_use]
pub fn registry_channel(initial: WaitingRoomSnapshot) -> (RegistryHandle, RegistryReceiver) {
    let (sender, receiver) = watch::channel(initial);
    (RegistryHandle { sender }, RegistryReceiver(receiver))
}

/// Writer side, held by the presence/session adapter.
#[derive(Debug)]
pub struct RegistryHandle {
    sender: watch::Sender<WaitingRoomSnapshot>,
}

impl RegistryHandle {
    /// Append a user to the queue matching `is_authenticated`.
    ///
    /// Returns `false` if the user is already pending.
    pub fn push_pending(&self, user: PendingUser) -> bool {
        self.sender.send_if_modified(|snapshot| {
            if snapshot.queues.contains(&user.id) {
                return false;
            }
            debug!(
                target: "wr.registry",
                user_id = %user.id,
                authenticated = user.is_authenticated,
                "User pending"
            );
            if user.is_authenticated {
                snapshot.queues.authenticated.push(user);
            } else {
                snapshot.queues.guest.push(user);
            }
            true
        })
    }

    /// Remove a user from whichever queue holds it.
    pub fn remove_pending(&self, user_id: &UserId) -> bool {
        self.sender
            .send_if_modified(|snapshot| remove_from(&mut snapshot.queues, |id| id == user_id) > 0)
    }

    /// Remove every target of an applied decision. Returns how many were removed.
    pub fn remove_decided(&self, decision: &AdmissionDecision) -> usize {
        let mut removed = 0;
        self.sender.send_if_modified(|snapshot| {
            removed = remove_from(&mut snapshot.queues, |id| decision.targets(id));
            removed > 0
        });
        removed
    }

    /// Replace both queues wholesale (e.g. after a resync).
    pub fn replace_queues(&self, queues: PendingQueues) {
        self.sender.send_if_modified(|snapshot| {
            if snapshot.queues == queues {
                return false;
            }
            snapshot.queues = queues;
            true
        });
    }

    /// Replace the session flags.
    pub fn set_flags(&self, flags: SessionFlags) {
        self.sender.send_if_modified(|snapshot| {
            if snapshot.flags == flags {
                return false;
            }
            debug!(target: "wr.registry", ?flags, "Session flags changed");
            snapshot.flags = flags;
            true
        });
    }

    /// Current snapshot, as seen by the writer.
    #[must_use]
    pub fn snapshot(&self) -> WaitingRoomSnapshot {
        self.sender.borrow().clone()
    }

    /// Create another receiver.
    #[must_use]
    pub fn subscribe(&self) -> RegistryReceiver {
        RegistryReceiver(self.sender.subscribe())
    }
}

fn remove_from(queues: &mut PendingQueues, mut matches: impl FnMut(&UserId) -> bool) -> usize {
    let before = queues.pending_count();
    queues.authenticated.retain(|u| !matches(&u.id));
    queues.guest.retain(|u| !matches(&u.id));
    before - queues.pending_count()
}

/// Read side of the registry.
///
/// Cloning is cheap; each clone tracks its own "seen" position.
#[derive(Debug, Clone)]
pub struct RegistryReceiver(watch::Receiver<WaitingRoomSnapshot>);

impl RegistryReceiver {
    /// Owned copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WaitingRoomSnapshot {
        self.0.borrow().clone()
    }

    /// Owned copy of the current snapshot, marking it as seen.
    pub fn snapshot_and_mark_seen(&mut self) -> WaitingRoomSnapshot {
        self.0.borrow_and_update().clone()
    }

    /// Wait for the next change.
    ///
    /// # Errors
    ///
    /// Returns `WaitingRoomError::RegistryClosed` if the handle was dropped.
    pub async fn changed(&mut self) -> Result<(), WaitingRoomError> {
        self.0
            .changed()
            .await
            .map_err(|_| WaitingRoomError::RegistryClosed)
    }
}
