//! Route handlers
//!
//! All HTTP request handlers organized by domain.

pub mod challenges;
pub mod coupons;
pub mod health;
pub mod points;
pub mod redemptions;
pub mod usages;
