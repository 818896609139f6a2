//! Common data types for waiting room components.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a meeting (live session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeetingId(pub Uuid);

impl MeetingId {
    /// Create a new random meeting ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MeetingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque identifier for a user's session attempt.
///
/// Issued by the presence service; stable for as long as the user waits.
/// Serialized as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identifier issued by the presence service
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random identifier with the given prefix
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", Uuid::new_v4()))
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_as_bare_string() {
        let id = UserId::new("w_abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"w_abc123\"");

        let back: UserId = serde_json::from_str("\"w_abc123\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_user_id_generate_uses_prefix() {
        let a = UserId::generate("guest");
        let b = UserId::generate("guest");
        assert!(a.as_str().starts_with("guest-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_meeting_id_display_matches_uuid() {
        let id = MeetingId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
