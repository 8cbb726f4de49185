//! Coupon service
//!
//! Public coupon listing and staff-side coupon management.

use noxly_core::entities::Coupon;
use noxly_core::{DomainError, Snowflake, StaffPermissions};
use tracing::{info, instrument};

use crate::dto::{CouponResponse, CreateCouponRequest, UpdateCouponRequest};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::staff::StaffService;

/// Coupon service
pub struct CouponService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CouponService<'a> {
    /// Create a new CouponService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Redeemable coupons, optionally for one organization
    #[instrument(skip(self))]
    pub async fn list(&self, organization_id: Option<Snowflake>) -> ServiceResult<Vec<CouponResponse>> {
        let now = self.ctx.clock().now();
        let coupons = self.ctx.coupon_repo().list_public(organization_id, now).await?;
        Ok(coupons.into_iter().map(CouponResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, coupon_id: Snowflake) -> ServiceResult<CouponResponse> {
        Ok(CouponResponse::from(self.find(coupon_id).await?))
    }

    /// Create a coupon in an organization the caller manages
    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        user_id: Snowflake,
        organization_id: Snowflake,
        request: CreateCouponRequest,
    ) -> ServiceResult<CouponResponse> {
        StaffService::new(self.ctx)
            .resolve_scope(organization_id, user_id)
            .await?
            .require(StaffPermissions::MANAGE_COUPONS)?;

        let mut coupon = Coupon::new(self.ctx.generate_id(), organization_id, request.title);
        coupon.description = request.description;
        coupon.is_code_required = request.is_code_required;
        coupon.max_uses_per_user = request.max_uses_per_user;
        coupon.total_max_uses = request.total_max_uses;
        coupon.points_cost = request.points_cost;
        coupon.points_reward = request.points_reward;
        coupon.expiry_date = request.expiry_date;
        coupon.validate()?;

        self.ctx.coupon_repo().create(&coupon).await?;

        info!(
            coupon_id = %coupon.id,
            organization_id = %organization_id,
            created_by = %user_id,
            "Coupon created"
        );

        Ok(CouponResponse::from(coupon))
    }

    /// Apply a partial update; the result must still be a valid coupon
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        user_id: Snowflake,
        coupon_id: Snowflake,
        request: UpdateCouponRequest,
    ) -> ServiceResult<CouponResponse> {
        let mut coupon = self.find_managed(user_id, coupon_id).await?;

        if let Some(title) = request.title {
            coupon.title = title;
        }
        if request.description.is_some() {
            coupon.description = request.description;
        }
        if let Some(max) = request.max_uses_per_user {
            coupon.max_uses_per_user = max;
        }
        if let Some(total) = request.total_max_uses {
            coupon.total_max_uses = total;
        }
        if let Some(cost) = request.points_cost {
            coupon.points_cost = cost;
        }
        if let Some(reward) = request.points_reward {
            coupon.points_reward = reward;
        }
        if let Some(expiry) = request.expiry_date {
            coupon.expiry_date = expiry;
        }
        if let Some(active) = request.is_active {
            coupon.is_active = active;
        }
        coupon.updated_at = self.ctx.clock().now();
        coupon.validate()?;

        self.ctx.coupon_repo().update(&coupon).await?;

        info!(coupon_id = %coupon_id, updated_by = %user_id, "Coupon updated");

        Ok(CouponResponse::from(coupon))
    }

    /// Withdraw a coupon; its usage history is kept
    #[instrument(skip(self))]
    pub async fn archive(&self, user_id: Snowflake, coupon_id: Snowflake) -> ServiceResult<()> {
        self.find_managed(user_id, coupon_id).await?;
        self.ctx.coupon_repo().archive(coupon_id).await?;

        info!(coupon_id = %coupon_id, archived_by = %user_id, "Coupon archived");
        Ok(())
    }

    async fn find(&self, coupon_id: Snowflake) -> ServiceResult<Coupon> {
        Ok(self
            .ctx
            .coupon_repo()
            .find_by_id(coupon_id)
            .await?
            .ok_or(DomainError::CouponNotFound(coupon_id))?)
    }

    async fn find_managed(&self, user_id: Snowflake, coupon_id: Snowflake) -> ServiceResult<Coupon> {
        let coupon = self.find(coupon_id).await?;
        StaffService::new(self.ctx)
            .resolve_scope(coupon.organization_id, user_id)
            .await?
            .require(StaffPermissions::MANAGE_COUPONS)?;
        Ok(coupon)
    }
}
