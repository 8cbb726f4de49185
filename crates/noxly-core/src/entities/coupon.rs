//! Coupon entity - an offer published by an organization

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Coupon entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    pub id: Snowflake,
    pub organization_id: Snowflake,
    pub title: String,
    pub description: Option<String>,
    /// Timed 6-digit code validated by staff, otherwise redeemed instantly
    pub is_code_required: bool,
    /// 0 means unlimited
    pub max_uses_per_user: i32,
    /// Cap across all users, `None` means unlimited
    pub total_max_uses: Option<i32>,
    pub points_cost: i64,
    pub points_reward: i64,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Create a new active, code-based coupon with no limits and no points
    pub fn new(id: Snowflake, organization_id: Snowflake, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            organization_id,
            title,
            description: None,
            is_code_required: true,
            max_uses_per_user: 0,
            total_max_uses: None,
            points_cost: 0,
            points_reward: 0,
            expiry_date: None,
            is_active: true,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check point and limit configuration
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "title must not be empty".to_string(),
            ));
        }
        if self.points_cost < 0 || self.points_reward < 0 {
            return Err(DomainError::ValidationError(
                "points must not be negative".to_string(),
            ));
        }
        if self.points_cost > 0 && self.points_reward > 0 {
            return Err(DomainError::InvalidPointConfiguration);
        }
        if self.max_uses_per_user < 0 {
            return Err(DomainError::ValidationError(
                "max_uses_per_user must not be negative".to_string(),
            ));
        }
        if matches!(self.total_max_uses, Some(total) if total < 1) {
            return Err(DomainError::ValidationError(
                "total_max_uses must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Active, not archived and not past its expiry date
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_archived && self.expiry_date.map_or(true, |end| now <= end)
    }

    #[inline]
    pub fn is_unlimited(&self) -> bool {
        self.max_uses_per_user == 0
    }

    /// Whether a user with `used` finalized redemptions may start another
    pub fn allows_another_use(&self, used: i64) -> bool {
        self.is_unlimited() || used < i64::from(self.max_uses_per_user)
    }

    /// Uses left for a user, `None` when unlimited
    pub fn remaining_uses(&self, used: i64) -> Option<i64> {
        if self.is_unlimited() {
            None
        } else {
            Some((i64::from(self.max_uses_per_user) - used).max(0))
        }
    }

    /// Whether `redeemed` finalized uses across all users exhaust the coupon
    pub fn is_exhausted(&self, redeemed: i64) -> bool {
        self.total_max_uses
            .is_some_and(|total| redeemed >= i64::from(total))
    }

    pub fn archive(&mut self) {
        self.is_archived = true;
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}
