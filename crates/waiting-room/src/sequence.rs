//! Display ordinals for pending users.
//!
//! Ordinals are 1-based and derived from the queue's current order every
//! time they are needed. They are never cached and never feed a decision.

use crate::types::PendingUser;

/// Pair each user with its 1-based position in arrival order.
pub fn numbered(queue: &[PendingUser]) -> impl Iterator<Item = (usize, &PendingUser)> + '_ {
    queue.iter().enumerate().map(|(idx, user)| (idx + 1, user))
}

/// The ordinals for a queue of `queue.len()` users.
#[must_use]
pub fn ordinals(queue: &[PendingUser]) -> Vec<usize> {
    numbered(queue).map(|(ordinal, _)| ordinal).collect()
}

/// Row label shown to the moderator, e.g. `[2] Alice`.
#[must_use]
pub fn row_label(ordinal: usize, user: &PendingUser) -> String {
    format!("[{ordinal}] {}", user.display_name)
}
