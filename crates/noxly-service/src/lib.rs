//! # noxly-service
//!
//! Application layer containing the redemption lifecycle, coupon management,
//! points and challenges, plus the DTOs the API speaks.

pub mod dto;
pub mod services;

pub use services::{
    spawn_usage_sweeper, ChallengeService, CouponService, PointService, RedemptionService,
    RedemptionSettings, RedemptionWatch, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult, StaffService,
};
