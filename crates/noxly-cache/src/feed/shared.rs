//! Usage feed shared across instances through Redis pub/sub.

use std::sync::Arc;

use async_trait::async_trait;
use noxly_core::{Snowflake, UsageChange};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::{FeedSubscription, LocalUsageFeed, UsageFeed};
use crate::pool::RedisPool;
use crate::pubsub::{PubSubChannel, Publisher, Subscriber, SubscriberConfig, SubscriberResult};

/// Publishes every change to Redis and relays what comes back into the local hub.
///
/// Changes published by this instance reach local subscribers through the
/// same relay. When Redis is unreachable the change is delivered locally only.
pub struct RedisUsageFeed {
    publisher: Publisher,
    local: Arc<LocalUsageFeed>,
    subscriber: Subscriber,
    relay: JoinHandle<()>,
}

impl RedisUsageFeed {
    /// Connect the subscriber and start relaying
    pub async fn start(pool: RedisPool, config: SubscriberConfig) -> SubscriberResult<Self> {
        let subscriber = Subscriber::start(config);
        subscriber
            .subscribe(&[PubSubChannel::usage_changes()])
            .await?;

        let local = Arc::new(LocalUsageFeed::new());
        let relay = tokio::spawn(Self::relay_loop(subscriber.receiver(), local.clone()));

        tracing::info!("Redis usage feed started");

        Ok(Self {
            publisher: Publisher::new(pool),
            local,
            subscriber,
            relay,
        })
    }

    async fn relay_loop(
        mut rx: tokio::sync::broadcast::Receiver<crate::pubsub::ReceivedMessage>,
        local: Arc<LocalUsageFeed>,
    ) {
        loop {
            match rx.recv().await {
                Ok(msg) if msg.channel == PubSubChannel::UsageChanges => {
                    if let Some(change) = msg.event.as_ref().and_then(|e| e.as_usage_change()) {
                        local.deliver(&change);
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Usage feed relay lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Stop relaying and close the pub/sub connection
    pub async fn shutdown(&self) {
        self.relay.abort();
        if let Err(e) = self.subscriber.shutdown().await {
            tracing::debug!(error = %e, "Subscriber already stopped");
        }
    }
}

impl Drop for RedisUsageFeed {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

#[async_trait]
impl UsageFeed for RedisUsageFeed {
    async fn publish(&self, change: &UsageChange) {
        if let Err(e) = self.publisher.publish_usage_change(change).await {
            tracing::warn!(
                error = %e,
                usage_id = %change.usage_id,
                "Redis publish failed, delivering locally"
            );
            self.local.deliver(change);
        }
    }

    fn subscribe(&self, user_id: Snowflake) -> FeedSubscription {
        self.local.subscribe(user_id)
    }
}
