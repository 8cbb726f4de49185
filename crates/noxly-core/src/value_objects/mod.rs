//! Value objects - immutable types that represent domain concepts

mod permissions;
mod redemption_code;
mod snowflake;

pub use permissions::StaffPermissions;
pub use redemption_code::{CodeSource, RandomCodeSource, RedemptionCode};
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
