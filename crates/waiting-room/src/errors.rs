//! Waiting room error types.
//!
//! Error types map to numeric codes for the surface layer. Backend details
//! are logged but never exposed to the moderator.

use crate::types::{AdmissionStatus, GuestPolicy};
use common::types::UserId;
use std::time::Duration;
use thiserror::Error;

/// Waiting room error type.
///
/// Maps to surface error codes:
/// - `InvalidAction`, `InvalidLobbyMessage`: `INVALID_REQUEST` (2)
/// - `UserNotPending`: `NOT_FOUND` (4)
/// - `RegistryClosed`: `INTERNAL_ERROR` (6)
/// - `PolicyApplyFailed`, `BatchApplyPartialFailure`: `PARTIAL_FAILURE` (8)
/// - `BatchApplyFailure`, `Backend`: `BACKEND_FAILURE` (9)
#[derive(Debug, Error)]
pub enum WaitingRoomError {
    /// Action incompatible with the current session flags (contract violation).
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Single-user action on a user that is no longer pending.
    #[error("User not pending: {0}")]
    UserNotPending(UserId),

    /// Lobby message rejected.
    #[error("Invalid lobby message: {0}")]
    InvalidLobbyMessage(String),

    /// Default policy could not be persisted.
    #[error("Failed to apply policy {}: {reason}", .policy.as_str())]
    PolicyApplyFailed { policy: GuestPolicy, reason: String },

    /// Some targeted users were not admitted/denied.
    #[error("Batch {} partially applied: {} user(s) failed", .status.as_str(), .failed_user_ids.len())]
    BatchApplyPartialFailure {
        status: AdmissionStatus,
        failed_user_ids: Vec<UserId>,
    },

    /// No targeted user was admitted/denied.
    #[error("Batch apply failed: {reason}")]
    BatchApplyFailure { reason: String, policy_reverted: bool },

    /// Backend call failed outside of a batch (e.g. lobby message).
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The queue registry has been dropped.
    #[error("Queue registry closed")]
    RegistryClosed,
}

impl WaitingRoomError {
    /// Returns the surface error code for this error.
    pub fn error_code(&self) -> i32 {
        match self {
            WaitingRoomError::InvalidAction(_) | WaitingRoomError::InvalidLobbyMessage(_) => 2, // INVALID_REQUEST
            WaitingRoomError::UserNotPending(_) => 4, // NOT_FOUND
            WaitingRoomError::RegistryClosed => 6, // INTERNAL_ERROR
            WaitingRoomError::PolicyApplyFailed { .. }
            | WaitingRoomError::BatchApplyPartialFailure { .. } => 8, // PARTIAL_FAILURE
            WaitingRoomError::BatchApplyFailure { .. } | WaitingRoomError::Backend(_) => 9, // BACKEND_FAILURE
        }
    }

    /// Returns a moderator-safe error message (no backend details).
    pub fn client_message(&self) -> String {
        match self {
            WaitingRoomError::InvalidAction(_) => "This action is not available".to_string(),
            WaitingRoomError::RegistryClosed => "An internal error occurred".to_string(),
            WaitingRoomError::UserNotPending(_) => "User is no longer waiting".to_string(),
            WaitingRoomError::InvalidLobbyMessage(msg) => msg.clone(),
            WaitingRoomError::PolicyApplyFailed { .. } => {
                "Your choice could not be remembered for future arrivals".to_string()
            }
            WaitingRoomError::BatchApplyPartialFailure {
                failed_user_ids, ..
            } => format!(
                "{} user(s) could not be processed, please retry",
                failed_user_ids.len()
            ),
            WaitingRoomError::BatchApplyFailure { .. } => {
                "Waiting users could not be processed, please retry".to_string()
            }
            WaitingRoomError::Backend(_) => "The session service is unavailable, please retry".to_string(),
        }
    }

    /// Users the moderator should retry, if any.
    pub fn failed_user_ids(&self) -> &[UserId] {
        match self {
            WaitingRoomError::BatchApplyPartialFailure {
                failed_user_ids, ..
            } => failed_user_ids,
            _ => &[],
        }
    }

    /// Whether re-issuing the same decision is safe and may succeed.
    ///
    /// Decisions are idempotent per user at the backend.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WaitingRoomError::PolicyApplyFailed { .. }
                | WaitingRoomError::BatchApplyPartialFailure { .. }
                | WaitingRoomError::BatchApplyFailure { .. }
                | WaitingRoomError::Backend(_)
        )
    }
}

/// Errors returned by backend seams.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Backend unreachable.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the request.
    #[error("Backend rejected request: {0}")]
    Rejected(String),

    /// Backend did not answer in time.
    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),
}
