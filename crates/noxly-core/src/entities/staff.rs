//! Staff membership and the scope a staff request acts under

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::value_objects::{Snowflake, StaffPermissions};

/// A user working for an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffMember {
    pub organization_id: Snowflake,
    pub user_id: Snowflake,
    pub permissions: StaffPermissions,
    pub created_at: DateTime<Utc>,
}

impl StaffMember {
    pub fn scope(&self) -> StaffScope {
        StaffScope {
            user_id: self.user_id,
            organization_id: self.organization_id,
            permissions: self.permissions,
        }
    }
}

/// Explicit organization context passed to every staff-facing call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffScope {
    pub user_id: Snowflake,
    pub organization_id: Snowflake,
    pub permissions: StaffPermissions,
}

impl StaffScope {
    pub fn require(&self, permission: StaffPermissions) -> Result<(), DomainError> {
        if self.permissions.has(permission) {
            Ok(())
        } else {
            Err(DomainError::MissingPermission(permission.to_string()))
        }
    }
}
