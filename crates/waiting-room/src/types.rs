//! Shared data and contract types for the waiting room.
//!
//! Queues and flags are owned by external collaborators (presence service,
//! session configuration). The engine only reads them. `AdmissionDecision`
//! is an ephemeral command consumed once by the backend.

use common::types::UserId;
use serde::{Deserialize, Serialize};

/// Role of a pending user. Only used for the moderator badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Moderator,
    Viewer,
    Guest,
}

/// One waiting participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUser {
    /// Stable for the user's session attempt.
    pub id: UserId,
    /// Human-readable name (non-empty).
    pub display_name: String,
    pub role: UserRole,
    /// Display accent, opaque to the engine.
    pub color: String,
    pub avatar_url: Option<String>,
    /// Recognized account holder (`true`) or anonymous guest (`false`).
    pub is_authenticated: bool,
}

impl PendingUser {
    /// Create a pending viewer with no avatar and a neutral accent.
    #[must_use]
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>, is_authenticated: bool) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role: if is_authenticated {
                UserRole::Viewer
            } else {
                UserRole::Guest
            },
            color: "#4a148c".to_string(),
            avatar_url: None,
            is_authenticated,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    #[must_use]
    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    /// Whether the row should carry the moderator badge.
    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.role == UserRole::Moderator
    }
}

/// Snapshot of both pending queues, each in arrival order.
///
/// The order is the order supplied by the presence service and is never
/// re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQueues {
    pub authenticated: Vec<PendingUser>,
    pub guest: Vec<PendingUser>,
}

impl PendingQueues {
    #[must_use]
    pub fn new(authenticated: Vec<PendingUser>, guest: Vec<PendingUser>) -> Self {
        Self {
            authenticated,
            guest,
        }
    }

    /// Total number of pending users across both queues.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.authenticated.len() + self.guest.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.authenticated.is_empty() && self.guest.is_empty()
    }

    /// Find a pending user in either queue.
    #[must_use]
    pub fn find(&self, user_id: &UserId) -> Option<&PendingUser> {
        self.authenticated
            .iter()
            .chain(self.guest.iter())
            .find(|u| &u.id == user_id)
    }

    #[must_use]
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.find(user_id).is_some()
    }
}

/// Session-wide default applied to future arrivals.
///
/// "Ask the moderator every time" is represented by the absence of a policy
/// (`Option<GuestPolicy>::None`), not by a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuestPolicy {
    /// Accept guests and authenticated users.
    AlwaysAccept,
    /// Auto-accept authenticated users only.
    AlwaysAcceptAuth,
    /// Deny everyone.
    AlwaysDeny,
}

impl GuestPolicy {
    /// Wire name of the policy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GuestPolicy::AlwaysAccept => "ALWAYS_ACCEPT",
            GuestPolicy::AlwaysAcceptAuth => "ALWAYS_ACCEPT_AUTH",
            GuestPolicy::AlwaysDeny => "ALWAYS_DENY",
        }
    }
}

/// Label for a policy override, including the implicit default.
#[must_use]
pub fn policy_label(policy: Option<GuestPolicy>) -> &'static str {
    policy.map_or("ASK_MODERATOR", GuestPolicy::as_str)
}

/// Admission status carried by a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionStatus {
    Allow,
    Deny,
}

impl AdmissionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AdmissionStatus::Allow => "ALLOW",
            AdmissionStatus::Deny => "DENY",
        }
    }
}

/// A single admit/deny command for one or more pending users.
///
/// Never persisted. Targets are unique and keep the order in which the
/// engine collected them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub target_user_ids: Vec<UserId>,
    pub status: AdmissionStatus,
}

impl AdmissionDecision {
    #[must_use]
    pub fn len(&self) -> usize {
        self.target_user_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.target_user_ids.is_empty()
    }

    #[must_use]
    pub fn targets(&self, user_id: &UserId) -> bool {
        self.target_user_ids.contains(user_id)
    }
}

/// Externally owned session configuration, read-only to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFlags {
    pub waiting_room_enabled: bool,
    /// Whether authenticated-user-specific bulk options are offered.
    pub authenticated_guest_mode_enabled: bool,
    pub lobby_message_feature_enabled: bool,
    /// Whether the "remember choice" toggle is offered.
    pub allow_remember_choice: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            waiting_room_enabled: true,
            authenticated_guest_mode_enabled: false,
            lobby_message_feature_enabled: false,
            allow_remember_choice: true,
        }
    }
}
