//! Domain entities - core business objects

mod challenge;
mod coupon;
mod points;
mod staff;
mod usage;

pub use challenge::{Challenge, ChallengeCondition, ChallengeProgress};
pub use coupon::Coupon;
pub use points::PointBalance;
pub use staff::{StaffMember, StaffScope};
pub use usage::{ExpiryState, UsageRecord, DEFAULT_VALIDITY_SECONDS};
