//! Route definitions
//!
//! All API routes organized by domain and mounted under /api/v1.

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::{challenges, coupons, health, points, redemptions, usages};
use crate::state::AppState;

/// Create the main API router with all routes (excluding health for separate middleware handling)
pub fn create_router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_routes())
}

/// Health check routes (exported separately to bypass rate limiting)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(coupon_routes())
        .merge(redemption_routes())
        .merge(usage_routes())
        .merge(user_routes())
        .merge(challenge_routes())
}

/// Coupon routes
fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(coupons::list_coupons))
        .route(
            "/coupons/:coupon_id",
            get(coupons::get_coupon)
                .patch(coupons::update_coupon)
                .delete(coupons::archive_coupon),
        )
        .route(
            "/organizations/:organization_id/coupons",
            post(coupons::create_coupon),
        )
}

/// Redemption routes
fn redemption_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/coupons/:coupon_id/redemptions",
            post(redemptions::initiate_redemption),
        )
        .route("/redemptions/finalize", post(redemptions::finalize_redemption))
}

/// Usage routes
fn usage_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons/:coupon_id/usage", get(usages::get_usage_status))
        .route("/usages/:usage_id", delete(usages::cancel_usage))
        .route("/usages/:usage_id/watch", get(usages::watch_usage))
}

/// Current user routes
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/@me/points", get(points::get_my_points))
        .route("/users/@me/challenges", get(challenges::get_my_challenges))
        .route("/users/@me/usages/feed", get(usages::usage_feed))
}

/// Challenge routes
fn challenge_routes() -> Router<AppState> {
    Router::new().route(
        "/challenges/:challenge_id/claim",
        post(challenges::claim_challenge_reward),
    )
}
