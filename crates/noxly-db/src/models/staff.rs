//! Staff membership database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for staff_members table
#[derive(Debug, Clone, FromRow)]
pub struct StaffMemberModel {
    pub organization_id: i64,
    pub user_id: i64,
    pub permissions: i64,
    pub created_at: DateTime<Utc>,
}
