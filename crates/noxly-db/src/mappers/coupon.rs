//! Coupon entity <-> model mapper

use noxly_core::entities::Coupon;
use noxly_core::value_objects::Snowflake;

use crate::models::CouponModel;

/// Convert CouponModel to Coupon entity
impl From<CouponModel> for Coupon {
    fn from(model: CouponModel) -> Self {
        Coupon {
            id: Snowflake::new(model.id),
            organization_id: Snowflake::new(model.organization_id),
            title: model.title,
            description: model.description,
            is_code_required: model.is_code_required,
            max_uses_per_user: model.max_uses_per_user,
            total_max_uses: model.total_max_uses,
            points_cost: model.points_cost,
            points_reward: model.points_reward,
            expiry_date: model.expiry_date,
            is_active: model.is_active,
            is_archived: model.is_archived,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
