//! Staff service
//!
//! Resolves the organization scope staff requests act under.

use noxly_core::entities::{StaffMember, StaffScope};
use noxly_core::{DomainError, Snowflake, StaffPermissions};
use tracing::{info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Staff service
pub struct StaffService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> StaffService<'a> {
    /// Create a new StaffService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Scope of `user_id` inside `organization_id`, or `NotStaffMember`
    #[instrument(skip(self))]
    pub async fn resolve_scope(
        &self,
        organization_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<StaffScope> {
        let member = self
            .ctx
            .staff_repo()
            .find_member(organization_id, user_id)
            .await?
            .ok_or(DomainError::NotStaffMember)?;
        Ok(member.scope())
    }

    /// Grant staff permissions, replacing any existing grant
    #[instrument(skip(self))]
    pub async fn add_member(
        &self,
        organization_id: Snowflake,
        user_id: Snowflake,
        permissions: StaffPermissions,
    ) -> ServiceResult<StaffScope> {
        let member = StaffMember {
            organization_id,
            user_id,
            permissions,
            created_at: self.ctx.clock().now(),
        };
        self.ctx.staff_repo().add_member(&member).await?;

        info!(
            organization_id = %organization_id,
            user_id = %user_id,
            permissions = %permissions,
            "Staff member added"
        );

        Ok(member.scope())
    }
}
