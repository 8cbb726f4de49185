//! Domain events

mod usage_event;

pub use usage_event::UsageChange;
