//! Ports implemented by the infrastructure crates

mod clock;
mod repositories;

pub use clock::{Clock, ManualClock, SystemClock};
pub use repositories::{
    ChallengeRepository, CouponRepository, NewUsage, PointRepository, RepoResult,
    StaffRepository, UsageRepository,
};
