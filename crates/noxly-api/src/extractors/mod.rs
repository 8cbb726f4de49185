//! Axum extractors for request handling
//!
//! Custom extractors for authentication, staff scope, path parameters and validation.

mod auth;
mod path;
mod staff;
mod validated;

pub use auth::AuthUser;
pub use path::{parse_snowflake, ChallengeIdPath, CouponIdPath, OrganizationIdPath, UsageIdPath};
pub use staff::StaffContext;
pub use validated::ValidatedJson;
