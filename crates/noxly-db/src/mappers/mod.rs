//! Entity to model mappers
//!
//! Conversions between domain entities (noxly-core) and database models.
//! - `From<Model> for Entity` (or `TryFrom` where stored data can be rejected)
//! - `*Insert` structs: Prepare entity data for database operations

mod challenge;
mod coupon;
mod staff;
mod usage;

pub use challenge::ChallengeInsert;
pub use usage::organization_ids;
