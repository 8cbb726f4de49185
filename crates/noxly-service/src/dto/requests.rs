//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use validator::Validate;

// ============================================================================
// Redemption Requests
// ============================================================================

/// Staff request to finalize a shown code
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FinalizeRedemptionRequest {
    #[validate(length(min = 6, max = 16, message = "Code must be 6 digits"))]
    pub code: String,
}

// ============================================================================
// Coupon Requests
// ============================================================================

fn default_true() -> bool {
    true
}

/// Tells an explicit `null` (`Some(None)`) apart from an absent field (`None`)
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Create coupon request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub is_code_required: bool,

    /// 0 means unlimited
    #[serde(default)]
    #[validate(range(min = 0, message = "max_uses_per_user must not be negative"))]
    pub max_uses_per_user: i32,

    #[validate(range(min = 1, message = "total_max_uses must be at least 1"))]
    pub total_max_uses: Option<i32>,

    #[serde(default)]
    #[validate(range(min = 0, message = "points_cost must not be negative"))]
    pub points_cost: i64,

    #[serde(default)]
    #[validate(range(min = 0, message = "points_reward must not be negative"))]
    pub points_reward: i64,

    pub expiry_date: Option<DateTime<Utc>>,
}

/// Update coupon request; absent fields are left unchanged.
///
/// `total_max_uses` and `expiry_date` take `null` to go back to unlimited.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCouponRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "max_uses_per_user must not be negative"))]
    pub max_uses_per_user: Option<i32>,

    /// Checked against the updated coupon, a value below 1 is rejected there
    #[serde(default, deserialize_with = "nullable")]
    pub total_max_uses: Option<Option<i32>>,

    #[validate(range(min = 0, message = "points_cost must not be negative"))]
    pub points_cost: Option<i64>,

    #[validate(range(min = 0, message = "points_reward must not be negative"))]
    pub points_reward: Option<i64>,

    #[serde(default, deserialize_with = "nullable")]
    pub expiry_date: Option<Option<DateTime<Utc>>>,

    pub is_active: Option<bool>,
}

/// Public coupon listing filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCouponsQuery {
    pub organization_id: Option<String>,
}
