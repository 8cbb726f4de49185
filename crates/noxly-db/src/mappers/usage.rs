//! Usage record and point balance <-> model mappers

use noxly_core::entities::{PointBalance, UsageRecord};
use noxly_core::value_objects::{RedemptionCode, Snowflake};

use crate::models::{PointBalanceModel, UsageModel};

/// Convert UsageModel to UsageRecord entity
impl From<UsageModel> for UsageRecord {
    fn from(model: UsageModel) -> Self {
        UsageRecord {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            coupon_id: Snowflake::new(model.coupon_id),
            organization_id: Snowflake::new(model.organization_id),
            // column is CHECK-constrained to six digits
            redemption_code: model
                .redemption_code
                .and_then(|code| RedemptionCode::parse(&code).ok()),
            redeemed_at: model.redeemed_at,
            is_used: model.is_used,
            finalized_at: model.finalized_at,
            points_spent: model.points_spent,
            points_awarded: model.points_awarded,
        }
    }
}

/// Convert PointBalanceModel to PointBalance entity
impl From<PointBalanceModel> for PointBalance {
    fn from(model: PointBalanceModel) -> Self {
        PointBalance {
            user_id: Snowflake::new(model.user_id),
            organization_id: Snowflake::new(model.organization_id),
            points: model.points,
            updated_at: model.updated_at,
        }
    }
}

/// Organization filter as a BIGINT[] bind value
pub fn organization_ids(organizations: &[Snowflake]) -> Vec<i64> {
    organizations.iter().map(|id| id.into_inner()).collect()
}
