//! Usage ledger database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for coupon_usages table
#[derive(Debug, Clone, FromRow)]
pub struct UsageModel {
    pub id: i64,
    pub user_id: i64,
    pub coupon_id: i64,
    pub organization_id: i64,
    pub redemption_code: Option<String>,
    pub redeemed_at: DateTime<Utc>,
    pub is_used: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    pub points_spent: i64,
    pub points_awarded: i64,
}

/// Usage row joined with the fields of its coupon the finalizer needs
#[derive(Debug, Clone, FromRow)]
pub struct UsageForFinalizeModel {
    pub id: i64,
    pub user_id: i64,
    pub coupon_id: i64,
    pub redeemed_at: DateTime<Utc>,
    pub is_used: bool,
    pub coupon_organization_id: i64,
    pub points_reward: i64,
}

/// Usage caps of a coupon, read under a row lock before a finalized row is written
#[derive(Debug, Clone, FromRow)]
pub struct CouponCapsModel {
    pub max_uses_per_user: i32,
    pub total_max_uses: Option<i32>,
}
