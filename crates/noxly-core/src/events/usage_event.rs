//! Usage change events - pushed to the owning consumer's change feed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::UsageRecord;
use crate::value_objects::Snowflake;

/// One row-level change on the usage ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageChange {
    pub usage_id: Snowflake,
    pub coupon_id: Snowflake,
    pub user_id: Snowflake,
    pub is_used: bool,
    pub deleted: bool,
    pub timestamp: DateTime<Utc>,
}

impl UsageChange {
    /// Record inserted, pending or (for instant coupons) already finalized
    pub fn created(record: &UsageRecord) -> Self {
        Self::from_record(record, false)
    }

    pub fn finalized(record: &UsageRecord) -> Self {
        Self {
            is_used: true,
            ..Self::from_record(record, false)
        }
    }

    /// Pending record removed by cancel, client expiry or the sweeper
    pub fn deleted(record: &UsageRecord) -> Self {
        Self::from_record(record, true)
    }

    /// Event type name
    pub fn event_type(&self) -> &'static str {
        match (self.deleted, self.is_used) {
            (true, _) => "USAGE_DELETED",
            (false, true) => "USAGE_FINALIZED",
            (false, false) => "USAGE_CREATED",
        }
    }

    fn from_record(record: &UsageRecord, deleted: bool) -> Self {
        Self {
            usage_id: record.id,
            coupon_id: record.coupon_id,
            user_id: record.user_id,
            is_used: record.is_used,
            deleted,
            timestamp: Utc::now(),
        }
    }
}
