//! Read model for the admission panel.
//!
//! Everything the surface needs to render the panel, derived from one
//! snapshot. Strings, avatars and styling stay with the surface.

use crate::engine::{available_actions, BatchAction};
use crate::registry::WaitingRoomSnapshot;
use crate::sequence::numbered;
use crate::types::PendingUser;
use common::types::UserId;
use serde::Serialize;

/// One queue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRow {
    /// 1-based position in arrival order.
    pub ordinal: usize,
    pub user_id: UserId,
    pub display_name: String,
    pub moderator_badge: bool,
}

/// Panel contents for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    /// Bulk options, in display order. Empty when nobody is pending.
    pub batch_actions: Vec<BatchAction>,
    pub remember_choice_offered: bool,
    pub lobby_message_offered: bool,
    pub authenticated: Vec<PendingRow>,
    pub guests: Vec<PendingRow>,
}

impl PanelView {
    #[must_use]
    pub fn from_snapshot(snapshot: &WaitingRoomSnapshot) -> Self {
        let has_pending = !snapshot.queues.is_empty();
        let flags = &snapshot.flags;

        Self {
            batch_actions: if has_pending {
                available_actions(flags)
            } else {
                Vec::new()
            },
            remember_choice_offered: has_pending && flags.allow_remember_choice,
            lobby_message_offered: flags.lobby_message_feature_enabled,
            authenticated: rows(&snapshot.queues.authenticated),
            guests: rows(&snapshot.queues.guest),
        }
    }

    /// Whether anyone is waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.authenticated.is_empty() || !self.guests.is_empty()
    }
}

fn rows(queue: &[PendingUser]) -> Vec<PendingRow> {
    numbered(queue)
        .map(|(ordinal, user)| PendingRow {
            ordinal,
            user_id: user.id.clone(),
            display_name: user.display_name.clone(),
            moderator_badge: user.is_moderator(),
        })
        .collect()
}
