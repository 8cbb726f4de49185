//! Coupon handlers
//!
//! Public coupon listing plus staff-side coupon management.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use noxly_service::dto::{CouponResponse, CreateCouponRequest, ListCouponsQuery, UpdateCouponRequest};
use noxly_service::CouponService;

use crate::extractors::{parse_snowflake, AuthUser, CouponIdPath, OrganizationIdPath, ValidatedJson};
use crate::response::{ApiError, ApiResult, Created, NoContent};
use crate::state::AppState;

/// List redeemable coupons
///
/// GET /coupons?organization_id=
pub async fn list_coupons(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListCouponsQuery>,
) -> ApiResult<Json<Vec<CouponResponse>>> {
    let organization_id = query
        .organization_id
        .as_deref()
        .map(|id| {
            parse_snowflake(id, "organization_id")
                .map_err(|_| ApiError::invalid_query("Invalid organization_id format"))
        })
        .transpose()?;

    let service = CouponService::new(state.service_context());
    let coupons = service.list(organization_id).await?;
    Ok(Json(coupons))
}

/// Get coupon by ID
///
/// GET /coupons/{coupon_id}
pub async fn get_coupon(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(path): Path<CouponIdPath>,
) -> ApiResult<Json<CouponResponse>> {
    let coupon_id = path.coupon_id()?;

    let service = CouponService::new(state.service_context());
    let coupon = service.get(coupon_id).await?;
    Ok(Json(coupon))
}

/// Create a coupon in an organization
///
/// POST /organizations/{organization_id}/coupons
pub async fn create_coupon(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<OrganizationIdPath>,
    ValidatedJson(request): ValidatedJson<CreateCouponRequest>,
) -> ApiResult<Created<Json<CouponResponse>>> {
    let organization_id = path.organization_id()?;

    let service = CouponService::new(state.service_context());
    let coupon = service.create(auth.user_id, organization_id, request).await?;
    Ok(Created(Json(coupon)))
}

/// Update a coupon
///
/// PATCH /coupons/{coupon_id}
pub async fn update_coupon(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<CouponIdPath>,
    ValidatedJson(request): ValidatedJson<UpdateCouponRequest>,
) -> ApiResult<Json<CouponResponse>> {
    let coupon_id = path.coupon_id()?;

    let service = CouponService::new(state.service_context());
    let coupon = service.update(auth.user_id, coupon_id, request).await?;
    Ok(Json(coupon))
}

/// Archive a coupon
///
/// DELETE /coupons/{coupon_id}
pub async fn archive_coupon(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<CouponIdPath>,
) -> ApiResult<NoContent> {
    let coupon_id = path.coupon_id()?;

    let service = CouponService::new(state.service_context());
    service.archive(auth.user_id, coupon_id).await?;
    Ok(NoContent)
}
