//! Pre-configured test data for waiting room tests.
//!
//! Provides builders for:
//! - Pending users with different roles and authentication states
//! - Pending queues of arbitrary size
//! - Registry snapshots

use common::types::UserId;
use uuid::Uuid;
use waiting_room::registry::WaitingRoomSnapshot;
use waiting_room::types::{PendingQueues, PendingUser, SessionFlags, UserRole};

/// Test pending user fixture.
#[derive(Debug, Clone)]
pub struct TestPendingUser {
    id: String,
    name: String,
    is_authenticated: bool,
    role: Option<UserRole>,
}

impl TestPendingUser {
    /// An authenticated user with the given ID.
    #[must_use]
    pub fn authenticated(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: format!("User {id}"),
            id,
            is_authenticated: true,
            role: None,
        }
    }

    /// A guest with the given ID.
    #[must_use]
    pub fn guest(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: format!("Guest {id}"),
            id,
            is_authenticated: false,
            role: None,
        }
    }

    /// A guest with a random ID.
    #[must_use]
    pub fn random_guest() -> Self {
        Self::guest(format!("guest-{}", Uuid::new_v4()))
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Mark the user as a moderator.
    #[must_use]
    pub fn as_moderator(mut self) -> Self {
        self.role = Some(UserRole::Moderator);
        self
    }

    /// The user's ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        UserId::new(self.id.clone())
    }

    /// Build the pending user.
    #[must_use]
    pub fn build(self) -> PendingUser {
        let user = PendingUser::new(self.id, self.name, self.is_authenticated);
        match self.role {
            Some(role) => user.with_role(role),
            None => user,
        }
    }
}

/// Builder for pending queues.
///
/// Generated IDs are `auth-N` and `guest-N`, numbered from 1 in arrival order.
#[derive(Debug, Default)]
pub struct QueuesBuilder {
    authenticated: Vec<PendingUser>,
    guest: Vec<PendingUser>,
}

impl QueuesBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `count` generated authenticated users.
    #[must_use]
    pub fn authenticated(mut self, count: usize) -> Self {
        let start = self.authenticated.len();
        self.authenticated.extend(
            (start + 1..=start + count)
                .map(|n| TestPendingUser::authenticated(format!("auth-{n}")).build()),
        );
        self
    }

    /// Append `count` generated guests.
    #[must_use]
    pub fn guests(mut self, count: usize) -> Self {
        let start = self.guest.len();
        self.guest.extend(
            (start + 1..=start + count).map(|n| TestPendingUser::guest(format!("guest-{n}")).build()),
        );
        self
    }

    /// Append a specific user to the queue matching its authentication state.
    #[must_use]
    pub fn with_user(mut self, user: TestPendingUser) -> Self {
        let user = user.build();
        if user.is_authenticated {
            self.authenticated.push(user);
        } else {
            self.guest.push(user);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> PendingQueues {
        PendingQueues::new(self.authenticated, self.guest)
    }

    /// Build a registry snapshot with the given flags.
    #[must_use]
    pub fn snapshot(self, flags: SessionFlags) -> WaitingRoomSnapshot {
        WaitingRoomSnapshot {
            queues: self.build(),
            flags,
        }
    }
}

/// Session flags with every feature switched on.
#[must_use]
pub fn all_features() -> SessionFlags {
    SessionFlags {
        waiting_room_enabled: true,
        authenticated_guest_mode_enabled: true,
        lobby_message_feature_enabled: true,
        allow_remember_choice: true,
    }
}
