//! Path parameter extractors
//!
//! Typed access to the Snowflake IDs carried in route paths.

use noxly_core::Snowflake;
use serde::Deserialize;

use crate::response::ApiError;

/// Parse a path segment as a non-zero Snowflake
pub fn parse_snowflake(value: &str, name: &str) -> Result<Snowflake, ApiError> {
    match value.parse::<Snowflake>() {
        Ok(id) if !id.is_zero() => Ok(id),
        _ => Err(ApiError::invalid_path(format!("Invalid {name} format"))),
    }
}

/// Path parameters with coupon_id
#[derive(Debug, Deserialize)]
pub struct CouponIdPath {
    pub coupon_id: String,
}

impl CouponIdPath {
    pub fn coupon_id(&self) -> Result<Snowflake, ApiError> {
        parse_snowflake(&self.coupon_id, "coupon_id")
    }
}

/// Path parameters with usage_id
#[derive(Debug, Deserialize)]
pub struct UsageIdPath {
    pub usage_id: String,
}

impl UsageIdPath {
    pub fn usage_id(&self) -> Result<Snowflake, ApiError> {
        parse_snowflake(&self.usage_id, "usage_id")
    }
}

/// Path parameters with challenge_id
#[derive(Debug, Deserialize)]
pub struct ChallengeIdPath {
    pub challenge_id: String,
}

impl ChallengeIdPath {
    pub fn challenge_id(&self) -> Result<Snowflake, ApiError> {
        parse_snowflake(&self.challenge_id, "challenge_id")
    }
}

/// Path parameters with organization_id
#[derive(Debug, Deserialize)]
pub struct OrganizationIdPath {
    pub organization_id: String,
}

impl OrganizationIdPath {
    pub fn organization_id(&self) -> Result<Snowflake, ApiError> {
        parse_snowflake(&self.organization_id, "organization_id")
    }
}
