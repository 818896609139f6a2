//! Panel lifecycle controller.
//!
//! Closes the admission panel once it has nothing left to do: the waiting
//! room is switched off and nobody is pending. The controller only ever
//! requests a close; opening is driven by the layout/navigation layer.
//!
//! Evaluation is edge-triggered. A close is issued when the close condition
//! becomes true, and not again until it has been false in between, so
//! repeated evaluation of the same state is a no-op.

use crate::observability::metrics::{record_panel_close, set_pending_users};
use crate::registry::{RegistryReceiver, WaitingRoomSnapshot};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Layout/navigation collaborator that owns the panel's open state.
pub trait PanelLayout: Send + Sync {
    /// Close the waiting users panel. Harmless if already closed.
    fn close_panel(&self);
}

/// Whether the panel should be closed for this snapshot.
#[must_use]
pub fn should_close(snapshot: &WaitingRoomSnapshot) -> bool {
    !snapshot.flags.waiting_room_enabled && snapshot.queues.is_empty()
}

/// Derives panel close requests from registry state.
pub struct PanelLifecycle {
    receiver: RegistryReceiver,
    layout: Arc<dyn PanelLayout>,
    /// Whether a close was already issued for the current closed-condition run.
    close_issued: bool,
}

impl PanelLifecycle {
    #[must_use]
    pub fn new(receiver: RegistryReceiver, layout: Arc<dyn PanelLayout>) -> Self {
        Self {
            receiver,
            layout,
            close_issued: false,
        }
    }

    /// Evaluate the latest snapshot. Returns `true` if a close was issued.
    pub fn evaluate(&mut self) -> bool {
        let snapshot = self.receiver.snapshot_and_mark_seen();
        self.evaluate_snapshot(&snapshot)
    }

    fn evaluate_snapshot(&mut self, snapshot: &WaitingRoomSnapshot) -> bool {
        set_pending_users("authenticated", snapshot.queues.authenticated.len());
        set_pending_users("guest", snapshot.queues.guest.len());

        if !should_close(snapshot) {
            self.close_issued = false;
            return false;
        }
        if self.close_issued {
            return false;
        }

        info!(
            target: "wr.lifecycle",
            "Waiting room disabled with no pending users, closing panel"
        );
        self.layout.close_panel();
        record_panel_close("lifecycle");
        self.close_issued = true;
        true
    }

    /// Evaluate once, then again on every registry change until cancelled
    /// or the registry is dropped.
    #[instrument(skip_all, name = "wr.lifecycle")]
    pub async fn run(mut self, cancel_token: CancellationToken) {
        self.evaluate();

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    debug!(target: "wr.lifecycle", "Lifecycle controller cancelled");
                    break;
                }
                changed = self.receiver.changed() => {
                    if changed.is_err() {
                        debug!(target: "wr.lifecycle", "Registry closed, stopping lifecycle controller");
                        break;
                    }
                    self.evaluate();
                }
            }
        }
    }
}

/// Spawn a lifecycle controller on the current runtime.
pub fn spawn_lifecycle_controller(
    receiver: RegistryReceiver,
    layout: Arc<dyn PanelLayout>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(PanelLifecycle::new(receiver, layout).run(cancel_token))
}
