//! Point service

use noxly_core::Snowflake;
use tracing::instrument;

use crate::dto::PointBalanceResponse;

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Point service
pub struct PointService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PointService<'a> {
    /// Create a new PointService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Every organization balance the user holds
    #[instrument(skip(self))]
    pub async fn list_balances(&self, user_id: Snowflake) -> ServiceResult<Vec<PointBalanceResponse>> {
        let balances = self.ctx.point_repo().list_balances(user_id).await?;
        Ok(balances.into_iter().map(PointBalanceResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn balance(&self, user_id: Snowflake, organization_id: Snowflake) -> ServiceResult<i64> {
        Ok(self.ctx.point_repo().balance(user_id, organization_id).await?)
    }
}
