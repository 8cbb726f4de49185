//! In-process usage feed.

use std::sync::Arc;

use async_trait::async_trait;
use noxly_core::{Snowflake, UsageChange};
use tokio::sync::broadcast;

use super::{FeedSubscription, SenderMap, UsageFeed, DEFAULT_FEED_CAPACITY};

/// Usage feed that only reaches subscribers on this instance
#[derive(Debug)]
pub struct LocalUsageFeed {
    capacity: usize,
    senders: Arc<SenderMap>,
}

impl LocalUsageFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            senders: Arc::new(SenderMap::new()),
        }
    }

    /// Deliver to local subscribers of the change's owner
    pub fn deliver(&self, change: &UsageChange) {
        let delivered = match self.senders.get(&change.user_id) {
            Some(tx) => tx.send(change.clone()).is_ok(),
            None => return,
        };

        if !delivered {
            // every receiver is gone
            self.senders
                .remove_if(&change.user_id, |_, tx| tx.receiver_count() == 0);
        }
    }

    /// Live subscriptions for a consumer
    #[must_use]
    pub fn subscriber_count(&self, user_id: Snowflake) -> usize {
        self.senders
            .get(&user_id)
            .map_or(0, |tx| tx.receiver_count())
    }
}

impl Default for LocalUsageFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageFeed for LocalUsageFeed {
    async fn publish(&self, change: &UsageChange) {
        self.deliver(change);
    }

    fn subscribe(&self, user_id: Snowflake) -> FeedSubscription {
        let rx = self
            .senders
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        FeedSubscription::new(user_id, rx, Arc::downgrade(&self.senders))
    }
}
