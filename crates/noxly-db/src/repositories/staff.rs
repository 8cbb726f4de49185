//! PostgreSQL implementation of StaffRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use noxly_core::entities::StaffMember;
use noxly_core::traits::{RepoResult, StaffRepository};
use noxly_core::value_objects::Snowflake;

use crate::models::StaffMemberModel;

use super::error::map_db_error;

/// PostgreSQL implementation of StaffRepository
#[derive(Clone)]
pub struct PgStaffRepository {
    pool: PgPool,
}

impl PgStaffRepository {
    /// Create a new PgStaffRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffRepository for PgStaffRepository {
    #[instrument(skip(self))]
    async fn find_member(
        &self,
        organization_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<StaffMember>> {
        let result = sqlx::query_as::<_, StaffMemberModel>(
            r"
            SELECT organization_id, user_id, permissions, created_at
            FROM staff_members
            WHERE organization_id = $1 AND user_id = $2
            ",
        )
        .bind(organization_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(StaffMember::from))
    }

    #[instrument(skip(self, member), fields(organization_id = %member.organization_id, user_id = %member.user_id))]
    async fn add_member(&self, member: &StaffMember) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO staff_members (organization_id, user_id, permissions, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (organization_id, user_id) DO UPDATE SET permissions = EXCLUDED.permissions
            ",
        )
        .bind(member.organization_id.into_inner())
        .bind(member.user_id.into_inner())
        .bind(member.permissions.to_i64())
        .bind(member.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
