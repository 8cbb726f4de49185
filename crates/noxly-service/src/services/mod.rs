//! Business logic services
//!
//! This module contains all service layer implementations that handle
//! business logic, validation, and orchestration of domain operations.

pub mod challenge;
pub mod context;
pub mod coupon;
pub mod error;
pub mod points;
pub mod redemption;
pub mod staff;
pub mod sweeper;
pub mod watch;

// Re-export all services for convenience
pub use challenge::ChallengeService;
pub use context::{RedemptionSettings, ServiceContext, ServiceContextBuilder};
pub use coupon::CouponService;
pub use error::{ServiceError, ServiceResult};
pub use points::PointService;
pub use redemption::RedemptionService;
pub use staff::StaffService;
pub use sweeper::spawn_usage_sweeper;
pub use watch::RedemptionWatch;
