//! # noxly-core
//!
//! Domain layer containing entities, value objects, repository traits, and domain events
//! for coupon redemption, loyalty points and challenges.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Challenge, ChallengeCondition, ChallengeProgress, Coupon, ExpiryState, PointBalance,
    StaffMember, StaffScope, UsageRecord, DEFAULT_VALIDITY_SECONDS,
};
pub use error::DomainError;
pub use events::UsageChange;
pub use traits::{
    ChallengeRepository, Clock, CouponRepository, ManualClock, NewUsage, PointRepository,
    RepoResult, StaffRepository, SystemClock, UsageRepository,
};
pub use value_objects::{
    CodeSource, RandomCodeSource, RedemptionCode, Snowflake, SnowflakeGenerator,
    SnowflakeParseError, StaffPermissions,
};
