//! Loyalty point balance per (user, organization)

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointBalance {
    pub user_id: Snowflake,
    pub organization_id: Snowflake,
    pub points: i64,
    pub updated_at: DateTime<Utc>,
}

impl PointBalance {
    pub fn empty(user_id: Snowflake, organization_id: Snowflake) -> Self {
        Self {
            user_id,
            organization_id,
            points: 0,
            updated_at: Utc::now(),
        }
    }

    #[inline]
    pub fn covers(&self, cost: i64) -> bool {
        self.points >= cost
    }
}
