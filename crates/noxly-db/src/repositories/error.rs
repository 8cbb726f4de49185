//! Error handling utilities for repositories

use noxly_core::error::DomainError;
use noxly_core::value_objects::Snowflake;
use sqlx::Error as SqlxError;

/// Partial unique index guarding one pending usage per (user, coupon)
pub const PENDING_USER_COUPON_INDEX: &str = "uq_coupon_usages_pending_user_coupon";

/// Partial unique index guarding one pending usage per code
pub const PENDING_CODE_INDEX: &str = "uq_coupon_usages_pending_code";

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    DomainError::DatabaseError(e.to_string())
}

/// Map a unique violation by the name of the constraint that fired
pub fn map_pending_insert_error(e: SqlxError) -> DomainError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(PENDING_USER_COUPON_INDEX) => DomainError::AlreadyPending,
                Some(PENDING_CODE_INDEX) => DomainError::CodeCollision,
                _ => DomainError::DatabaseError(e.to_string()),
            };
        }
    }
    DomainError::DatabaseError(e.to_string())
}

/// Create a "coupon not found" error
pub fn coupon_not_found(id: Snowflake) -> DomainError {
    DomainError::CouponNotFound(id)
}

/// Create a "usage not found" error
pub fn usage_not_found(id: Snowflake) -> DomainError {
    DomainError::UsageNotFound(id)
}

/// Create a "challenge not found" error
pub fn challenge_not_found(id: Snowflake) -> DomainError {
    DomainError::ChallengeNotFound(id)
}
