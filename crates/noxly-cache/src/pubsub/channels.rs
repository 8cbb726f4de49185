//! Pub/Sub channel definitions.

use noxly_core::Snowflake;

/// Channel prefix for user-specific events
pub const USER_CHANNEL_PREFIX: &str = "user:";
/// Channel carrying every usage ledger change, fanned out per user by each instance
pub const USAGE_CHANGES_CHANNEL: &str = "usage_changes";

/// Pub/Sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Events for a specific user
    User(Snowflake),
    /// Usage ledger changes for all users
    UsageChanges,
    /// Custom channel name
    Custom(String),
}

impl PubSubChannel {
    #[must_use]
    pub fn user(user_id: Snowflake) -> Self {
        Self::User(user_id)
    }

    #[must_use]
    pub fn usage_changes() -> Self {
        Self::UsageChanges
    }

    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::User(id) => format!("{USER_CHANNEL_PREFIX}{id}"),
            Self::UsageChanges => USAGE_CHANGES_CHANNEL.to_string(),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a channel name back to a `PubSubChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name == USAGE_CHANGES_CHANNEL {
            return Self::UsageChanges;
        }

        if let Some(id) = name
            .strip_prefix(USER_CHANNEL_PREFIX)
            .and_then(|s| s.parse::<i64>().ok())
        {
            return Self::User(Snowflake::from(id));
        }

        Self::Custom(name.to_string())
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
