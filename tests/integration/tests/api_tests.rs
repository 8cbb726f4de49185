//! API Integration Tests
//!
//! Each test spawns the router on a local port over the in-memory store, so
//! no PostgreSQL or Redis instance is needed.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use std::time::Duration;

use futures::StreamExt;
use integration_tests::{assert_error, assert_json, assert_status, TestServer};
use noxly_core::entities::ChallengeCondition;
use noxly_core::StaffPermissions;
use noxly_service::RedemptionService;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};

/// Read an SSE body until `needle` shows up, returning everything read so far
async fn read_until(response: Response, needle: &str) -> String {
    let mut body = response.bytes_stream();
    let mut seen = String::new();

    let found = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = body.next().await {
            let chunk = chunk.expect("stream chunk");
            seen.push_str(&String::from_utf8_lossy(&chunk));
            if seen.contains(needle) {
                return true;
            }
        }
        false
    })
    .await;

    assert!(matches!(found, Ok(true)), "never saw {needle:?} in {seen:?}");
    seen
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_health_ready_without_backing_stores() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");

    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "ready");
    assert!(body["checks"].get("database").is_none());
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_missing_auth_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let coupon = server.harness.coupon(server.harness.id(), |_| {});

    let response = server
        .client
        .post(server.url(&format!("/api/v1/coupons/{}/redemptions", coupon.id)))
        .send()
        .await
        .unwrap();

    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "MISSING_AUTHORIZATION");
}

#[tokio::test]
async fn test_malformed_path_id_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let token = server.harness.token(server.harness.id());

    let response = server
        .get_auth("/api/v1/coupons/not-a-number", &token)
        .await
        .unwrap();

    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "INVALID_PATH_PARAMETER");
}

// ============================================================================
// Redemption Flow Tests
// ============================================================================

#[tokio::test]
async fn test_initiate_then_finalize_once() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |c| c.points_reward = 5);
    let staff = h.validator(org);

    let response = server
        .post_empty_auth(
            &format!("/api/v1/coupons/{}/redemptions", coupon.id),
            &h.token(user),
        )
        .await
        .unwrap();
    let initiated: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(initiated["mode"], "code");
    let code = initiated["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    let staff_token = h.token(staff.user_id);
    let org_header = org.to_string();
    let body = json!({ "code": code });

    let response = server
        .post_staff("/api/v1/redemptions/finalize", &staff_token, &org_header, &body)
        .await
        .unwrap();
    let finalized: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(finalized["success"], true);
    assert_eq!(finalized["usage_id"], initiated["usage_id"]);
    assert_eq!(finalized["user_id"], user.to_string());
    assert_eq!(finalized["reward_points"], 5);

    let response = server
        .post_staff("/api/v1/redemptions/finalize", &staff_token, &org_header, &body)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "ALREADY_REDEEMED");
}

#[tokio::test]
async fn test_finalize_requires_organization_header() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let staff = h.validator(h.id());

    let response = server
        .post_auth(
            "/api/v1/redemptions/finalize",
            &h.token(staff.user_id),
            &json!({ "code": "123456" }),
        )
        .await
        .unwrap();

    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "MISSING_ORGANIZATION");
}

#[tokio::test]
async fn test_finalize_by_non_staff_is_forbidden() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let org = h.id();

    let response = server
        .post_staff(
            "/api/v1/redemptions/finalize",
            &h.token(h.id()),
            &org.to_string(),
            &json!({ "code": "123456" }),
        )
        .await
        .unwrap();

    let code = assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(code, "NOT_STAFF_MEMBER");
}

#[tokio::test]
async fn test_insufficient_points_reports_details() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |c| c.points_cost = 50);
    h.store.set_points(user, org, 40);

    let response = server
        .post_empty_auth(
            &format!("/api/v1/coupons/{}/redemptions", coupon.id),
            &h.token(user),
        )
        .await
        .unwrap();

    let body: Value = assert_json(response, StatusCode::UNPROCESSABLE_ENTITY)
        .await
        .unwrap();
    assert_eq!(body["error"]["code"], "INSUFFICIENT_POINTS");
    assert_eq!(body["error"]["details"]["required"], 50);
    assert_eq!(body["error"]["details"]["available"], 40);
}

#[tokio::test]
async fn test_usage_status_and_cancel() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let user = h.id();
    let token = h.token(user);
    let coupon = h.coupon(h.id(), |c| c.max_uses_per_user = 3);

    let initiated = RedemptionService::new(&h.ctx)
        .initiate(user, coupon.id)
        .await
        .unwrap();

    let response = server
        .get_auth(&format!("/api/v1/coupons/{}/usage", coupon.id), &token)
        .await
        .unwrap();
    let status: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(status["pending"], true);
    assert_eq!(status["pending_usage"]["code"], initiated.code.unwrap());
    assert_eq!(status["remaining_uses"], 3);

    let path = format!("/api/v1/usages/{}", initiated.usage_id);
    let response = server.delete_auth(&path, &token).await.unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let response = server.delete_auth(&path, &token).await.unwrap();
    let code = assert_error(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(code, "UNKNOWN_USAGE");
}

// ============================================================================
// Coupon Management Tests
// ============================================================================

#[tokio::test]
async fn test_coupon_lifecycle() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let org = h.id();
    let manager = h.staff(org, StaffPermissions::MANAGE_COUPONS);
    let token = h.token(manager.user_id);

    let response = server
        .post_auth(
            &format!("/api/v1/organizations/{org}/coupons"),
            &token,
            &json!({ "title": "Free pastry", "max_uses_per_user": 1, "points_reward": 15 }),
        )
        .await
        .unwrap();
    let created: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(created["organization_id"], org.to_string());
    assert_eq!(created["is_code_required"], true);
    let coupon_path = format!("/api/v1/coupons/{}", created["id"].as_str().unwrap());

    let response = server
        .patch_auth(&coupon_path, &token, &json!({ "title": "Free croissant" }))
        .await
        .unwrap();
    let updated: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(updated["title"], "Free croissant");
    assert_eq!(updated["points_reward"], 15);

    let response = server
        .get_auth(&format!("/api/v1/coupons?organization_id={org}"), &token)
        .await
        .unwrap();
    let listed: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = server.delete_auth(&coupon_path, &token).await.unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let response = server
        .get_auth(&format!("/api/v1/coupons?organization_id={org}"), &token)
        .await
        .unwrap();
    let listed: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_coupon_with_cost_and_reward_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let org = h.id();
    let manager = h.staff(org, StaffPermissions::MANAGE_COUPONS);

    let response = server
        .post_auth(
            &format!("/api/v1/organizations/{org}/coupons"),
            &h.token(manager.user_id),
            &json!({ "title": "Both", "points_cost": 10, "points_reward": 10 }),
        )
        .await
        .unwrap();

    assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
}

// ============================================================================
// Points and Challenges Tests
// ============================================================================

#[tokio::test]
async fn test_points_and_challenge_claim() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let org = h.id();
    let user = h.id();
    let token = h.token(user);
    let coupon = h.coupon(org, |c| {
        c.is_code_required = false;
        c.points_reward = 10;
    });
    let challenge = h.challenge(
        ChallengeCondition::RedeemCount {
            organizations: vec![org],
        },
        1,
        20,
        org,
    );

    let response = server
        .post_empty_auth(&format!("/api/v1/coupons/{}/redemptions", coupon.id), &token)
        .await
        .unwrap();
    let initiated: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(initiated["mode"], "instant");
    assert!(initiated["code"].is_null());

    let response = server.get_auth("/api/v1/users/@me/challenges", &token).await.unwrap();
    let challenges: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(challenges[0]["is_completed"], true);
    assert_eq!(challenges[0]["progress_percent"], 100);

    let claim_path = format!("/api/v1/challenges/{}/claim", challenge.id);
    let response = server.post_empty_auth(&claim_path, &token).await.unwrap();
    let claimed: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(claimed["reward_points"], 20);

    let response = server.post_empty_auth(&claim_path, &token).await.unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "REWARD_ALREADY_CLAIMED");

    let response = server.get_auth("/api/v1/users/@me/points", &token).await.unwrap();
    let balances: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(balances[0]["organization_id"], org.to_string());
    assert_eq!(balances[0]["points"], 30);
}

// ============================================================================
// Streaming Tests
// ============================================================================

#[tokio::test]
async fn test_usage_feed_streams_changes() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let user = h.id();
    let coupon = h.coupon(h.id(), |_| {});

    let response = server
        .get_auth("/api/v1/users/@me/usages/feed", &h.token(user))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let initiated = RedemptionService::new(&h.ctx)
        .initiate(user, coupon.id)
        .await
        .unwrap();

    let seen = read_until(response, "USAGE_CREATED").await;
    assert!(seen.contains(&initiated.usage_id));
}

#[tokio::test]
async fn test_watch_stream_reports_finalization() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |_| {});
    let staff = h.validator(org);

    let initiated = RedemptionService::new(&h.ctx)
        .initiate(user, coupon.id)
        .await
        .unwrap();

    let response = server
        .get_auth(
            &format!("/api/v1/usages/{}/watch", initiated.usage_id),
            &h.token(user),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    RedemptionService::new(&h.ctx)
        .finalize(initiated.code.as_deref().unwrap(), &staff)
        .await
        .unwrap();

    let seen = read_until(response, "finalized_externally").await;
    assert!(seen.contains("active"));
}

#[tokio::test]
async fn test_watch_of_foreign_usage_is_forbidden() {
    let server = TestServer::start().await.unwrap();
    let h = &server.harness;
    let coupon = h.coupon(h.id(), |_| {});

    let initiated = RedemptionService::new(&h.ctx)
        .initiate(h.id(), coupon.id)
        .await
        .unwrap();

    let response = server
        .get_auth(
            &format!("/api/v1/usages/{}/watch", initiated.usage_id),
            &h.token(h.id()),
        )
        .await
        .unwrap();

    assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
}
