//! Challenge handlers
//!
//! Progress listing and reward claims for the current user.

use axum::{
    extract::{Path, State},
    Json,
};
use noxly_service::dto::{ChallengeProgressResponse, ClaimRewardResponse};
use noxly_service::ChallengeService;

use crate::extractors::{AuthUser, ChallengeIdPath};
use crate::response::ApiResult;
use crate::state::AppState;

/// Active challenges with the caller's progress
///
/// GET /users/@me/challenges
pub async fn get_my_challenges(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<ChallengeProgressResponse>>> {
    let service = ChallengeService::new(state.service_context());
    let challenges = service.list_for_user(auth.user_id).await?;
    Ok(Json(challenges))
}

/// Claim the reward of a completed challenge
///
/// POST /challenges/{challenge_id}/claim
pub async fn claim_challenge_reward(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<ChallengeIdPath>,
) -> ApiResult<Json<ClaimRewardResponse>> {
    let challenge_id = path.challenge_id()?;

    let service = ChallengeService::new(state.service_context());
    let response = service.claim_reward(auth.user_id, challenge_id).await?;
    Ok(Json(response))
}
