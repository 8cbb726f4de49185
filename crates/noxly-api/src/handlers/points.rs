//! Point handlers

use axum::{extract::State, Json};
use noxly_service::dto::PointBalanceResponse;
use noxly_service::PointService;

use crate::extractors::AuthUser;
use crate::response::ApiResult;
use crate::state::AppState;

/// Point balances of the current user, one per organization
///
/// GET /users/@me/points
pub async fn get_my_points(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<PointBalanceResponse>>> {
    let service = PointService::new(state.service_context());
    let balances = service.list_balances(auth.user_id).await?;
    Ok(Json(balances))
}
