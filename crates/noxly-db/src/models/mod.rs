//! Database models - SQLx-compatible structs for PostgreSQL tables

mod challenge;
mod coupon;
mod points;
mod staff;
mod usage;

pub use challenge::{ChallengeModel, ChallengeProgressModel};
pub use coupon::CouponModel;
pub use points::PointBalanceModel;
pub use staff::StaffMemberModel;
pub use usage::{CouponCapsModel, UsageForFinalizeModel, UsageModel};
