//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in noxly-core.
//! Each repository handles database operations for a specific domain entity.

mod challenge;
mod coupon;
mod error;
mod points;
mod staff;
mod usage;

pub use challenge::PgChallengeRepository;
pub use coupon::PgCouponRepository;
pub use points::PgPointRepository;
pub use staff::PgStaffRepository;
pub use usage::PgUsageRepository;
