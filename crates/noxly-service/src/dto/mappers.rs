//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use noxly_core::entities::{Challenge, ChallengeProgress, Coupon, PointBalance};
use noxly_core::UsageChange;

use super::responses::{
    ChallengeProgressResponse, CouponResponse, PointBalanceResponse, UsageFeedEvent,
};

impl From<&Coupon> for CouponResponse {
    fn from(coupon: &Coupon) -> Self {
        Self {
            id: coupon.id.to_string(),
            organization_id: coupon.organization_id.to_string(),
            title: coupon.title.clone(),
            description: coupon.description.clone(),
            is_code_required: coupon.is_code_required,
            max_uses_per_user: coupon.max_uses_per_user,
            total_max_uses: coupon.total_max_uses,
            points_cost: coupon.points_cost,
            points_reward: coupon.points_reward,
            expiry_date: coupon.expiry_date,
            is_active: coupon.is_active,
            is_archived: coupon.is_archived,
            created_at: coupon.created_at,
            updated_at: coupon.updated_at,
        }
    }
}

impl From<Coupon> for CouponResponse {
    fn from(coupon: Coupon) -> Self {
        Self::from(&coupon)
    }
}

impl From<PointBalance> for PointBalanceResponse {
    fn from(balance: PointBalance) -> Self {
        Self {
            organization_id: balance.organization_id.to_string(),
            points: balance.points,
            updated_at: balance.updated_at,
        }
    }
}

impl From<&UsageChange> for UsageFeedEvent {
    fn from(change: &UsageChange) -> Self {
        Self {
            usage_id: change.usage_id.to_string(),
            coupon_id: change.coupon_id.to_string(),
            is_used: change.is_used,
            deleted: change.deleted,
        }
    }
}

/// Challenge joined with the consumer's progress row, if any
pub struct ChallengeWithProgress {
    pub challenge: Challenge,
    pub progress: Option<ChallengeProgress>,
}

impl From<ChallengeWithProgress> for ChallengeProgressResponse {
    fn from(data: ChallengeWithProgress) -> Self {
        let ChallengeWithProgress {
            challenge,
            progress,
        } = data;
        let progress_value = progress.as_ref().map_or(0, |p| p.progress_value);

        Self {
            challenge_id: challenge.id.to_string(),
            progress_percent: challenge.progress_percent(progress_value),
            condition_type: challenge.condition.tag().to_string(),
            organization_ids: challenge
                .condition
                .organizations()
                .iter()
                .map(ToString::to_string)
                .collect(),
            title: challenge.title,
            description: challenge.description,
            target_value: challenge.target_value,
            progress_value,
            is_completed: progress.as_ref().is_some_and(|p| p.is_completed),
            is_reward_claimed: progress.as_ref().is_some_and(|p| p.is_reward_claimed),
            reward_points: challenge.reward_points,
            reward_organization_id: challenge.reward_organization_id.to_string(),
        }
    }
}
