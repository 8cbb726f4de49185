//! Redis Pub/Sub publisher.

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::PubSubChannel;
use noxly_core::UsageChange;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// Event type carried on the usage changes channel
pub const USAGE_CHANGED_EVENT: &str = "USAGE_CHANGED";

/// Event wrapper for Pub/Sub messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubEvent {
    /// Event type name (e.g., "USAGE_CHANGED")
    pub event_type: String,
    /// Event payload
    pub data: serde_json::Value,
}

impl PubSubEvent {
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Wrap a usage ledger change
    pub fn usage_changed(change: &UsageChange) -> Result<Self, serde_json::Error> {
        Ok(Self::new(USAGE_CHANGED_EVENT, serde_json::to_value(change)?))
    }

    /// Extract the usage change, if this event carries one
    #[must_use]
    pub fn as_usage_change(&self) -> Option<UsageChange> {
        if self.event_type != USAGE_CHANGED_EVENT {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Redis Pub/Sub publisher
#[derive(Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event to a channel
    pub async fn publish(&self, channel: &PubSubChannel, event: &PubSubEvent) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let channel_name = channel.name();
        let payload = event.to_json()?;

        let receivers: u32 = conn.publish(&channel_name, &payload).await?;

        tracing::debug!(
            channel = %channel_name,
            event_type = %event.event_type,
            receivers = receivers,
            "Published event"
        );

        Ok(receivers)
    }

    /// Publish a usage ledger change to every instance
    pub async fn publish_usage_change(&self, change: &UsageChange) -> RedisResult<u32> {
        let event = PubSubEvent::usage_changed(change)?;
        self.publish(&PubSubChannel::usage_changes(), &event).await
    }
}
