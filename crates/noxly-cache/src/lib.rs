//! # noxly-cache
//!
//! Redis pool, pub/sub plumbing and the per-user usage change feed.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Pub/Sub**: Usage change distribution across server instances
//! - **Usage Feed**: Per-consumer subscriptions, in-process or Redis-backed
//!
//! ## Example
//!
//! ```ignore
//! use noxly_cache::{LocalUsageFeed, UsageFeed};
//!
//! let feed = LocalUsageFeed::new();
//! let mut subscription = feed.subscribe(user_id);
//!
//! feed.publish(&UsageChange::created(&record)).await;
//! let change = subscription.recv().await;
//! ```

pub mod feed;
pub mod pool;
pub mod pubsub;

pub use feed::{FeedSubscription, LocalUsageFeed, RedisUsageFeed, UsageFeed, DEFAULT_FEED_CAPACITY};

pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

pub use pubsub::{
    PubSubChannel, PubSubEvent, Publisher, ReceivedMessage, Subscriber, SubscriberConfig,
    SubscriberError, SubscriberResult, USAGE_CHANGED_EVENT, USAGE_CHANGES_CHANNEL,
    USER_CHANNEL_PREFIX,
};
