//! Coupon database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for coupons table
#[derive(Debug, Clone, FromRow)]
pub struct CouponModel {
    pub id: i64,
    pub organization_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_code_required: bool,
    pub max_uses_per_user: i32,
    pub total_max_uses: Option<i32>,
    pub points_cost: i64,
    pub points_reward: i64,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
