//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Coupon not found: {0}")]
    CouponNotFound(Snowflake),

    #[error("Usage not found: {0}")]
    UsageNotFound(Snowflake),

    #[error("Challenge not found: {0}")]
    ChallengeNotFound(Snowflake),

    #[error("Invalid redemption code")]
    InvalidCode,

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Points cost and points reward cannot both be set")]
    InvalidPointConfiguration,

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Authentication required")]
    Unauthorized,

    #[error("Missing permission: {0}")]
    MissingPermission(String),

    #[error("Not a staff member of this organization")]
    NotStaffMember,

    #[error("Code belongs to another organization")]
    WrongOrganization,

    #[error("Usage belongs to another user")]
    NotUsageOwner,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("A redemption for this coupon is already pending")]
    AlreadyPending,

    #[error("Code has already been redeemed")]
    AlreadyRedeemed,

    #[error("Usage is already finalized")]
    UsageAlreadyFinalized,

    #[error("Reward already claimed")]
    RewardAlreadyClaimed,

    #[error("Redemption code already in use")]
    CodeCollision,

    // =========================================================================
    // Business Rule Violations
    // =========================================================================
    #[error("Usage limit reached: max {max} per user")]
    LimitReached { max: i32 },

    #[error("Coupon has no uses left")]
    CouponExhausted,

    #[error("Coupon is not available")]
    CouponUnavailable,

    #[error("Insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("Challenge is not completed")]
    ChallengeNotCompleted,

    #[error("Redemption code has expired")]
    Expired,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Could not allocate a redemption code after {attempts} attempts")]
    CodeGenerationFailed { attempts: u32 },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::CouponNotFound(_) => "UNKNOWN_COUPON",
            Self::UsageNotFound(_) => "UNKNOWN_USAGE",
            Self::ChallengeNotFound(_) => "UNKNOWN_CHALLENGE",
            Self::InvalidCode => "INVALID_CODE",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidPointConfiguration => "INVALID_POINT_CONFIGURATION",

            // Authorization
            Self::Unauthorized => "UNAUTHORIZED",
            Self::MissingPermission(_) => "MISSING_PERMISSIONS",
            Self::NotStaffMember => "NOT_STAFF_MEMBER",
            Self::WrongOrganization => "WRONG_ORGANIZATION",
            Self::NotUsageOwner => "NOT_USAGE_OWNER",

            // Conflict
            Self::AlreadyPending => "ALREADY_PENDING",
            Self::AlreadyRedeemed => "ALREADY_REDEEMED",
            Self::UsageAlreadyFinalized => "USAGE_ALREADY_FINALIZED",
            Self::RewardAlreadyClaimed => "REWARD_ALREADY_CLAIMED",
            Self::CodeCollision => "CODE_COLLISION",

            // Business Rules
            Self::LimitReached { .. } => "LIMIT_REACHED",
            Self::CouponExhausted => "COUPON_EXHAUSTED",
            Self::CouponUnavailable => "COUPON_UNAVAILABLE",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::ChallengeNotCompleted => "CHALLENGE_NOT_COMPLETED",
            Self::Expired => "CODE_EXPIRED",

            // Infrastructure
            Self::CodeGenerationFailed { .. } => "CODE_GENERATION_FAILED",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CouponNotFound(_)
                | Self::UsageNotFound(_)
                | Self::ChallengeNotFound(_)
                | Self::InvalidCode
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::InvalidPointConfiguration
        )
    }

    /// Missing or invalid credentials
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::MissingPermission(_)
                | Self::NotStaffMember
                | Self::WrongOrganization
                | Self::NotUsageOwner
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyPending
                | Self::AlreadyRedeemed
                | Self::UsageAlreadyFinalized
                | Self::RewardAlreadyClaimed
                | Self::CodeCollision
        )
    }

    /// Request was well-formed but a business rule refused it
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            Self::LimitReached { .. }
                | Self::CouponExhausted
                | Self::CouponUnavailable
                | Self::InsufficientPoints { .. }
                | Self::ChallengeNotCompleted
        )
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Store failures that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::CacheError(_))
    }
}
