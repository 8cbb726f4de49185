//! Redemption handlers
//!
//! Consumers start a redemption; staff finalize the code the consumer shows.

use axum::{
    extract::{Path, State},
    Json,
};
use noxly_service::dto::{
    FinalizeRedemptionRequest, FinalizedRedemptionResponse, InitiatedRedemptionResponse,
};
use noxly_service::RedemptionService;

use crate::extractors::{AuthUser, CouponIdPath, StaffContext, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// Start redeeming a coupon
///
/// POST /coupons/{coupon_id}/redemptions
pub async fn initiate_redemption(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<CouponIdPath>,
) -> ApiResult<Created<Json<InitiatedRedemptionResponse>>> {
    let coupon_id = path.coupon_id()?;

    let service = RedemptionService::new(state.service_context());
    let response = service.initiate(auth.user_id, coupon_id).await?;
    Ok(Created(Json(response)))
}

/// Finalize a code shown by a consumer
///
/// POST /redemptions/finalize
pub async fn finalize_redemption(
    State(state): State<AppState>,
    StaffContext(scope): StaffContext,
    ValidatedJson(request): ValidatedJson<FinalizeRedemptionRequest>,
) -> ApiResult<Json<FinalizedRedemptionResponse>> {
    let service = RedemptionService::new(state.service_context());
    let response = service.finalize(request.code.trim(), &scope).await?;
    Ok(Json(response))
}
