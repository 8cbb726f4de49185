//! Usage record - one ledger entry per redemption attempt
//!
//! A record is created pending (`is_used = false`) when a consumer starts a
//! code-based redemption and flips to finalized exactly once when staff
//! validate the code. Instant coupons insert an already finalized record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{RedemptionCode, Snowflake};

/// Seconds a redemption code stays valid after issue
pub const DEFAULT_VALIDITY_SECONDS: i64 = 180;

/// Ledger entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub coupon_id: Snowflake,
    /// Copied from the coupon at insert
    pub organization_id: Snowflake,
    /// `None` for instant redemptions
    pub redemption_code: Option<RedemptionCode>,
    pub redeemed_at: DateTime<Utc>,
    pub is_used: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    /// Cost reserved at initiation
    pub points_spent: i64,
    /// Reward credited at finalization
    pub points_awarded: i64,
}

impl UsageRecord {
    #[inline]
    pub fn is_pending(&self) -> bool {
        !self.is_used
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.redeemed_at
    }

    pub fn expires_at(&self, window: Duration) -> DateTime<Utc> {
        self.redeemed_at + window
    }

    /// Whole seconds left in the window, clamped at zero
    pub fn remaining_seconds(&self, now: DateTime<Utc>, window: Duration) -> i64 {
        (window.num_seconds() - self.elapsed(now).num_seconds()).max(0)
    }

    /// Past the window; a record at exactly the window edge is still valid
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.elapsed(now) > window
    }
}

/// Client-side view of a pending redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExpiryState {
    Active { remaining_seconds: i64 },
    ExpiredClientSide,
    FinalizedExternally,
}

impl ExpiryState {
    pub fn evaluate(record: &UsageRecord, now: DateTime<Utc>, window: Duration) -> Self {
        if record.is_used {
            return Self::FinalizedExternally;
        }
        match record.remaining_seconds(now, window) {
            0 => Self::ExpiredClientSide,
            remaining_seconds => Self::Active { remaining_seconds },
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active { .. })
    }
}
