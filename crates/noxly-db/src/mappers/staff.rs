//! Staff member <-> model mapper

use noxly_core::entities::StaffMember;
use noxly_core::value_objects::{Snowflake, StaffPermissions};

use crate::models::StaffMemberModel;

impl From<StaffMemberModel> for StaffMember {
    fn from(model: StaffMemberModel) -> Self {
        StaffMember {
            organization_id: Snowflake::new(model.organization_id),
            user_id: Snowflake::new(model.user_id),
            permissions: StaffPermissions::from_i64(model.permissions),
            created_at: model.created_at,
        }
    }
}
