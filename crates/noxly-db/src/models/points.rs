//! Loyalty point balance database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for loyalty_point_balances table
#[derive(Debug, Clone, FromRow)]
pub struct PointBalanceModel {
    pub user_id: i64,
    pub organization_id: i64,
    pub points: i64,
    pub updated_at: DateTime<Utc>,
}
