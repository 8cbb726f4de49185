//! Redis Pub/Sub module.
//!
//! Distributes usage ledger changes between server instances.

mod channels;
mod publisher;
mod subscriber;

pub use channels::{PubSubChannel, USAGE_CHANGES_CHANNEL, USER_CHANNEL_PREFIX};
pub use publisher::{PubSubEvent, Publisher, USAGE_CHANGED_EVENT};
pub use subscriber::{
    ReceivedMessage, Subscriber, SubscriberConfig, SubscriberError, SubscriberResult,
};
