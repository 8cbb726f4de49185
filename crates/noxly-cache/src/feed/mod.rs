//! Per-user change feed over the usage ledger.
//!
//! Every insert, finalize and delete on a consumer's usage records is pushed
//! to that consumer's subscribers. Delivery is best effort: a slow subscriber
//! skips changes it lagged behind on, and a dropped subscription ends cleanly.

mod local;
mod shared;

pub use self::local::LocalUsageFeed;
pub use self::shared::RedisUsageFeed;

use std::sync::Weak;

use async_trait::async_trait;
use dashmap::DashMap;
use noxly_core::{Snowflake, UsageChange};
use tokio::sync::broadcast::{self, error::RecvError};

/// Per-consumer senders of the in-process hub
pub(crate) type SenderMap = DashMap<Snowflake, broadcast::Sender<UsageChange>>;

/// Buffered changes per subscriber before it starts lagging
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// Fan-out of usage changes to the consumer who owns them
#[async_trait]
pub trait UsageFeed: Send + Sync {
    /// Push a committed change; failures are logged, never surfaced
    async fn publish(&self, change: &UsageChange);

    /// Start receiving changes for one consumer
    fn subscribe(&self, user_id: Snowflake) -> FeedSubscription;
}

/// Receiving end of one consumer's feed. Dropping it unsubscribes.
#[derive(Debug)]
pub struct FeedSubscription {
    user_id: Snowflake,
    rx: broadcast::Receiver<UsageChange>,
    senders: Weak<SenderMap>,
}

impl FeedSubscription {
    pub(crate) fn new(
        user_id: Snowflake,
        rx: broadcast::Receiver<UsageChange>,
        senders: Weak<SenderMap>,
    ) -> Self {
        Self { user_id, rx, senders }
    }

    pub fn user_id(&self) -> Snowflake {
        self.user_id
    }

    /// Next change for this consumer, or `None` once the feed is gone
    pub async fn recv(&mut self) -> Option<UsageChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %self.user_id, skipped, "Usage feed subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        let Some(senders) = self.senders.upgrade() else {
            return;
        };
        // `rx` is still counted here
        senders.remove_if(&self.user_id, |_, tx| tx.receiver_count() <= 1);
    }
}
