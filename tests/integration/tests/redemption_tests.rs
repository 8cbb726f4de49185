//! Redemption lifecycle tests against the in-memory store
//!
//! Run with: cargo test -p integration-tests --test redemption_tests

use std::time::Duration as StdDuration;

use chrono::Duration;
use integration_tests::Harness;
use noxly_core::entities::{ChallengeCondition, ExpiryState};
use noxly_core::traits::{NewUsage, UsageRepository};
use noxly_core::{Clock, DomainError, Snowflake, StaffPermissions};
use noxly_service::dto::{CreateCouponRequest, RedemptionMode, UpdateCouponRequest};
use noxly_service::{
    spawn_usage_sweeper, ChallengeService, CouponService, RedemptionService, RedemptionSettings,
    RedemptionWatch, ServiceError, StaffService,
};

fn domain(err: &ServiceError) -> &DomainError {
    err.as_domain().expect("expected a domain error")
}

// ============================================================================
// Initiation
// ============================================================================

#[tokio::test]
async fn test_initiate_issues_six_digit_code() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |_| {});

    let started = h.clock.now();
    let response = RedemptionService::new(&h.ctx).initiate(user, coupon.id).await.unwrap();

    assert_eq!(response.mode, RedemptionMode::Code);
    let code = response.code.expect("code coupon issues a code");
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| b.is_ascii_digit()));
    assert_eq!(response.expires_at, Some(started + Duration::seconds(180)));
    assert_eq!(h.store.pending_count(), 1);
}

#[tokio::test]
async fn test_second_initiate_while_pending_is_rejected() {
    let h = Harness::new();
    let user = h.id();
    let coupon = h.coupon(h.id(), |_| {});
    let service = RedemptionService::new(&h.ctx);

    service.initiate(user, coupon.id).await.unwrap();
    let err = service.initiate(user, coupon.id).await.unwrap_err();

    assert!(matches!(domain(&err), DomainError::AlreadyPending));
    assert_eq!(h.store.pending_count(), 1);
}

#[tokio::test]
async fn test_expired_pending_is_replaced_on_initiate() {
    let h = Harness::new();
    let user = h.id();
    let coupon = h.coupon(h.id(), |_| {});
    let service = RedemptionService::new(&h.ctx);

    let first = service.initiate(user, coupon.id).await.unwrap();
    h.advance(181);
    let second = service.initiate(user, coupon.id).await.unwrap();

    assert_ne!(first.usage_id, second.usage_id);
    assert_eq!(h.store.pending_count(), 1);
}

#[tokio::test]
async fn test_zero_user_is_unauthorized() {
    let h = Harness::new();
    let coupon = h.coupon(h.id(), |_| {});

    let err = RedemptionService::new(&h.ctx)
        .initiate(Snowflake::new(0), coupon.id)
        .await
        .unwrap_err();

    assert!(matches!(domain(&err), DomainError::Unauthorized));
}

#[tokio::test]
async fn test_unknown_and_inactive_coupons() {
    let h = Harness::new();
    let user = h.id();
    let service = RedemptionService::new(&h.ctx);

    let err = service.initiate(user, h.id()).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::CouponNotFound(_)));

    let inactive = h.coupon(h.id(), |c| c.is_active = false);
    let err = service.initiate(user, inactive.id).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::CouponUnavailable));
}

#[tokio::test]
async fn test_instant_coupon_finalizes_immediately() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |c| {
        c.is_code_required = false;
        c.points_reward = 10;
    });

    let response = RedemptionService::new(&h.ctx).initiate(user, coupon.id).await.unwrap();

    assert_eq!(response.mode, RedemptionMode::Instant);
    assert!(response.code.is_none());
    assert!(response.expires_at.is_none());
    assert_eq!(response.points_awarded, 10);
    assert_eq!(response.balance, 10);
    assert_eq!(h.store.pending_count(), 0);
}

// ============================================================================
// Code uniqueness
// ============================================================================

#[tokio::test]
async fn test_live_code_is_never_issued_twice() {
    let h = Harness::new();
    let coupon = h.coupon(h.id(), |_| {});
    let service = RedemptionService::new(&h.ctx);

    h.codes.push("111111");
    h.codes.push("111111");
    h.codes.push("222222");

    let first = service.initiate(h.id(), coupon.id).await.unwrap();
    let second = service.initiate(h.id(), coupon.id).await.unwrap();

    assert_eq!(first.code.as_deref(), Some("111111"));
    assert_eq!(second.code.as_deref(), Some("222222"));
}

#[tokio::test]
async fn test_code_generation_gives_up_after_max_attempts() {
    let h = Harness::new();
    let coupon = h.coupon(h.id(), |_| {});
    let service = RedemptionService::new(&h.ctx);

    h.codes.push_repeated("333333", 6);
    service.initiate(h.id(), coupon.id).await.unwrap();

    let err = service.initiate(h.id(), coupon.id).await.unwrap_err();
    assert!(matches!(
        domain(&err),
        DomainError::CodeGenerationFailed { attempts: 5 }
    ));
}

#[tokio::test]
async fn test_transient_lookup_failures_consume_attempts() {
    let h = Harness::new();
    let coupon = h.coupon(h.id(), |_| {});
    let service = RedemptionService::new(&h.ctx);

    h.store.fail_next_code_lookups(2);
    assert!(service.initiate(h.id(), coupon.id).await.is_ok());

    h.store.fail_next_code_lookups(5);
    let err = service.initiate(h.id(), coupon.id).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::CodeGenerationFailed { .. }));
}

#[tokio::test]
async fn test_code_of_recently_finalized_usage_is_not_reissued() {
    let h = Harness::new();
    let org = h.id();
    let coupon = h.coupon(org, |_| {});
    let staff = h.validator(org);
    let service = RedemptionService::new(&h.ctx);

    h.codes.push("444444");
    service.initiate(h.id(), coupon.id).await.unwrap();
    service.finalize("444444", &staff).await.unwrap();

    h.codes.push("444444");
    h.codes.push("555555");
    let next = service.initiate(h.id(), coupon.id).await.unwrap();
    assert_eq!(next.code.as_deref(), Some("555555"));
}

// ============================================================================
// Finalization
// ============================================================================

#[tokio::test]
async fn test_shown_code_is_finalized_once() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |_| {});
    let staff = h.validator(org);
    let service = RedemptionService::new(&h.ctx);

    h.codes.push("482913");
    let initiated = service.initiate(user, coupon.id).await.unwrap();
    assert_eq!(initiated.code.as_deref(), Some("482913"));

    h.advance(42);
    let finalized = service.finalize("482913", &staff).await.unwrap();
    assert!(finalized.success);
    assert_eq!(finalized.usage_id, initiated.usage_id);
    assert_eq!(finalized.user_id, user.to_string());

    let err = service.finalize("482913", &staff).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::AlreadyRedeemed));

    let status = service.usage_status(user, coupon.id).await.unwrap();
    assert!(!status.pending);
    assert_eq!(status.used_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_finalize_has_one_winner() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |c| c.points_reward = 10);
    let staff = h.validator(org);

    h.codes.push("700700");
    RedemptionService::new(&h.ctx).initiate(user, coupon.id).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let ctx = h.ctx.clone();
        tasks.push(tokio::spawn(async move {
            RedemptionService::new(&ctx).finalize("700700", &staff).await
        }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert!(matches!(domain(&e), DomainError::AlreadyRedeemed)),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(h.store.points(user, org), 10);
}

#[tokio::test]
async fn test_finalize_expiry_boundary() {
    let h = Harness::new();
    let org = h.id();
    let coupon = h.coupon(org, |_| {});
    let staff = h.validator(org);
    let service = RedemptionService::new(&h.ctx);

    for (code, elapsed, accepted) in [("100179", 179, true), ("100180", 180, true), ("100181", 181, false)] {
        h.codes.push(code);
        service.initiate(h.id(), coupon.id).await.unwrap();
        h.advance(elapsed);

        let result = service.finalize(code, &staff).await;
        if accepted {
            assert!(result.is_ok(), "{code} should finalize after {elapsed}s");
        } else {
            assert!(matches!(domain(&result.unwrap_err()), DomainError::Expired));
        }
    }
}

#[tokio::test]
async fn test_finalize_checks_organization_and_permission() {
    let h = Harness::new();
    let org = h.id();
    let coupon = h.coupon(org, |_| {});
    let service = RedemptionService::new(&h.ctx);

    h.codes.push("909090");
    service.initiate(h.id(), coupon.id).await.unwrap();

    let other_staff = h.validator(h.id());
    let err = service.finalize("909090", &other_staff).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::WrongOrganization));

    let manager = h.staff(org, StaffPermissions::MANAGE_COUPONS);
    let err = service.finalize("909090", &manager).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::MissingPermission(_)));

    let owner = h.staff(org, StaffPermissions::OWNER);
    assert!(service.finalize("909090", &owner).await.is_ok());
}

#[tokio::test]
async fn test_finalize_rejects_unknown_or_malformed_codes() {
    let h = Harness::new();
    let org = h.id();
    let staff = h.validator(org);
    let service = RedemptionService::new(&h.ctx);

    for code in ["12ab56", "12345", "1234567", "000000"] {
        let err = service.finalize(code, &staff).await.unwrap_err();
        assert!(matches!(domain(&err), DomainError::InvalidCode), "{code}");
    }
}

// ============================================================================
// Limits
// ============================================================================

#[tokio::test]
async fn test_per_user_cap_of_two() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |c| c.max_uses_per_user = 2);
    let staff = h.validator(org);
    let service = RedemptionService::new(&h.ctx);

    for _ in 0..2 {
        let code = service.initiate(user, coupon.id).await.unwrap().code.unwrap();
        service.finalize(&code, &staff).await.unwrap();
    }

    let err = service.initiate(user, coupon.id).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::LimitReached { max: 2 }));

    let status = service.usage_status(user, coupon.id).await.unwrap();
    assert_eq!(status.used_count, 2);
    assert_eq!(status.remaining_uses, Some(0));
}

#[tokio::test]
async fn test_total_cap_exhausts_coupon() {
    let h = Harness::new();
    let coupon = h.coupon(h.id(), |c| {
        c.is_code_required = false;
        c.total_max_uses = Some(1);
    });
    let service = RedemptionService::new(&h.ctx);

    service.initiate(h.id(), coupon.id).await.unwrap();
    let err = service.initiate(h.id(), coupon.id).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::CouponExhausted));
}

#[tokio::test]
async fn test_total_cap_holds_across_outstanding_codes() {
    let h = Harness::new();
    let org = h.id();
    let (first, second) = (h.id(), h.id());
    let coupon = h.coupon(org, |c| {
        c.total_max_uses = Some(1);
        c.points_reward = 5;
    });
    let staff = h.validator(org);
    let service = RedemptionService::new(&h.ctx);

    h.codes.push("111111");
    h.codes.push("222222");
    service.initiate(first, coupon.id).await.unwrap();
    service.initiate(second, coupon.id).await.unwrap();

    service.finalize("111111", &staff).await.unwrap();
    let err = service.finalize("222222", &staff).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::CouponExhausted));

    assert_eq!(h.store.points(second, org), 0);
    assert_eq!(h.store.usages().iter().filter(|u| u.is_used).count(), 1);
}

#[tokio::test]
async fn test_instant_insert_enforces_caps_on_its_own() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |c| {
        c.is_code_required = false;
        c.max_uses_per_user = 1;
        c.points_reward = 10;
    });

    // Both rows were admitted by the service-level count before either landed
    let usage = |id: Snowflake| NewUsage {
        id,
        user_id: user,
        coupon_id: coupon.id,
        organization_id: org,
        code: None,
        redeemed_at: h.clock.now(),
        points_cost: 0,
        points_reward: 10,
    };

    h.store.insert_instant(&usage(h.id())).await.unwrap();
    let err = h.store.insert_instant(&usage(h.id())).await.unwrap_err();

    assert!(matches!(err, DomainError::LimitReached { max: 1 }));
    assert_eq!(h.store.points(user, org), 10);

    let shared = h.coupon(org, |c| {
        c.is_code_required = false;
        c.total_max_uses = Some(1);
    });
    let mut other = usage(h.id());
    other.coupon_id = shared.id;
    h.store.insert_instant(&other).await.unwrap();
    other.id = h.id();
    other.user_id = h.id();
    let err = h.store.insert_instant(&other).await.unwrap_err();
    assert!(matches!(err, DomainError::CouponExhausted));
}

// ============================================================================
// Points
// ============================================================================

#[tokio::test]
async fn test_cost_and_reward_are_mutually_exclusive() {
    let h = Harness::new();
    let org = h.id();
    let manager = h.staff(org, StaffPermissions::MANAGE_COUPONS);

    let request: CreateCouponRequest =
        serde_json::from_str(r#"{"title":"Both","points_cost":50,"points_reward":10}"#).unwrap();
    let err = CouponService::new(&h.ctx)
        .create(manager.user_id, org, request)
        .await
        .unwrap_err();

    assert!(matches!(domain(&err), DomainError::InvalidPointConfiguration));
}

#[tokio::test]
async fn test_points_cost_is_reserved_at_initiation() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |c| c.points_cost = 50);
    let staff = h.validator(org);
    let service = RedemptionService::new(&h.ctx);

    h.store.set_points(user, org, 40);
    let err = service.initiate(user, coupon.id).await.unwrap_err();
    assert!(matches!(
        domain(&err),
        DomainError::InsufficientPoints { required: 50, available: 40 }
    ));
    assert_eq!(h.store.points(user, org), 40);

    h.store.set_points(user, org, 120);
    let initiated = service.initiate(user, coupon.id).await.unwrap();
    assert_eq!(initiated.points_spent, 50);
    assert_eq!(initiated.balance, 70);

    service
        .finalize(initiated.code.as_deref().unwrap(), &staff)
        .await
        .unwrap();
    assert_eq!(h.store.points(user, org), 70);
}

#[tokio::test]
async fn test_cancel_refunds_reserved_points() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |c| c.points_cost = 50);
    let service = RedemptionService::new(&h.ctx);

    h.store.set_points(user, org, 100);
    let initiated = service.initiate(user, coupon.id).await.unwrap();
    let usage_id: Snowflake = initiated.usage_id.parse().unwrap();

    let err = service.cancel_pending(h.id(), usage_id).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::NotUsageOwner));

    service.cancel_pending(user, usage_id).await.unwrap();
    assert_eq!(h.store.points(user, org), 100);
    assert!(h.store.usage(usage_id).is_none());

    let err = service.cancel_pending(user, usage_id).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::UsageNotFound(_)));
}

#[tokio::test]
async fn test_finalized_usage_cannot_be_cancelled() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |_| {});
    let staff = h.validator(org);
    let service = RedemptionService::new(&h.ctx);

    let initiated = service.initiate(user, coupon.id).await.unwrap();
    service
        .finalize(initiated.code.as_deref().unwrap(), &staff)
        .await
        .unwrap();

    let err = service
        .cancel_pending(user, initiated.usage_id.parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(domain(&err), DomainError::UsageAlreadyFinalized));
}

// ============================================================================
// Expiry cleanup
// ============================================================================

#[tokio::test]
async fn test_purge_removes_only_expired_pending() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let old = h.coupon(org, |c| c.points_cost = 20);
    let fresh = h.coupon(org, |_| {});
    let service = RedemptionService::new(&h.ctx);

    h.store.set_points(user, org, 20);
    service.initiate(user, old.id).await.unwrap();
    h.advance(120);
    service.initiate(user, fresh.id).await.unwrap();

    h.advance(61);
    assert_eq!(service.purge_expired().await.unwrap(), 1);
    assert_eq!(h.store.pending_count(), 1);
    assert_eq!(h.store.points(user, org), 20);
}

#[tokio::test]
async fn test_sweeper_purges_in_background() {
    let h = Harness::new();
    let coupon = h.coupon(h.id(), |_| {});
    RedemptionService::new(&h.ctx)
        .initiate(h.id(), coupon.id)
        .await
        .unwrap();
    h.advance(200);

    let sweeper = spawn_usage_sweeper(h.ctx.clone(), StdDuration::from_millis(20));
    let purged = tokio::time::timeout(StdDuration::from_secs(2), async {
        while h.store.pending_count() > 0 {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
    })
    .await;
    sweeper.abort();

    assert!(purged.is_ok(), "sweeper did not purge the expired usage");
}

// ============================================================================
// Change feed and watch
// ============================================================================

#[tokio::test]
async fn test_feed_reports_created_and_finalized() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |_| {});
    let staff = h.validator(org);
    let service = RedemptionService::new(&h.ctx);

    let mut feed = h.ctx.usage_feed().subscribe(user);

    let initiated = service.initiate(user, coupon.id).await.unwrap();
    let created = feed.recv().await.unwrap();
    assert_eq!(created.usage_id.to_string(), initiated.usage_id);
    assert!(!created.is_used);
    assert!(!created.deleted);

    service
        .finalize(initiated.code.as_deref().unwrap(), &staff)
        .await
        .unwrap();
    let finalized = feed.recv().await.unwrap();
    assert!(finalized.is_used);
    assert_eq!(finalized.event_type(), "USAGE_FINALIZED");
}

async fn wait_terminal(watch: &RedemptionWatch) -> ExpiryState {
    let mut states = watch.subscribe();
    let state = tokio::time::timeout(
        StdDuration::from_secs(5),
        states.wait_for(ExpiryState::is_terminal),
    )
    .await
    .expect("watch did not settle")
    .expect("watch channel closed");
    *state
}

#[tokio::test]
async fn test_watch_expires_and_refunds() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |c| c.points_cost = 30);
    h.store.set_points(user, org, 30);

    let initiated = RedemptionService::new(&h.ctx).initiate(user, coupon.id).await.unwrap();
    let usage_id: Snowflake = initiated.usage_id.parse().unwrap();

    let watch = RedemptionWatch::start(&h.ctx, user, usage_id).await.unwrap();
    assert_eq!(watch.state(), ExpiryState::Active { remaining_seconds: 180 });

    h.advance(181);
    assert_eq!(wait_terminal(&watch).await, ExpiryState::ExpiredClientSide);

    tokio::time::timeout(StdDuration::from_secs(2), async {
        while h.store.usage(usage_id).is_some() {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
    })
    .await
    .expect("expired usage was not withdrawn");
    assert_eq!(h.store.points(user, org), 30);
}

#[tokio::test]
async fn test_watch_sees_external_finalization() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.coupon(org, |_| {});
    let staff = h.validator(org);

    let initiated = RedemptionService::new(&h.ctx).initiate(user, coupon.id).await.unwrap();
    let watch = RedemptionWatch::start(&h.ctx, user, initiated.usage_id.parse().unwrap())
        .await
        .unwrap();

    RedemptionService::new(&h.ctx)
        .finalize(initiated.code.as_deref().unwrap(), &staff)
        .await
        .unwrap();

    assert_eq!(wait_terminal(&watch).await, ExpiryState::FinalizedExternally);
    watch.close().await.unwrap();
}

#[tokio::test]
async fn test_watch_close_withdraws_active_usage() {
    let h = Harness::new();
    let user = h.id();
    let coupon = h.coupon(h.id(), |_| {});

    let initiated = RedemptionService::new(&h.ctx).initiate(user, coupon.id).await.unwrap();
    let usage_id: Snowflake = initiated.usage_id.parse().unwrap();

    let watch = RedemptionWatch::start(&h.ctx, user, usage_id).await.unwrap();
    watch.close().await.unwrap();

    assert!(h.store.usage(usage_id).is_none());
}

#[tokio::test]
async fn test_watch_rejects_other_users() {
    let h = Harness::new();
    let user = h.id();
    let coupon = h.coupon(h.id(), |_| {});

    let initiated = RedemptionService::new(&h.ctx).initiate(user, coupon.id).await.unwrap();
    let err = RedemptionWatch::start(&h.ctx, h.id(), initiated.usage_id.parse().unwrap())
        .await
        .err()
        .expect("foreign watch must fail");

    assert!(matches!(domain(&err), DomainError::NotUsageOwner));
}

// ============================================================================
// Challenges
// ============================================================================

#[tokio::test]
async fn test_redeem_count_challenge_pays_once() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let coupon = h.instant_coupon(org);
    let challenge = h.challenge(
        ChallengeCondition::RedeemCount {
            organizations: Vec::new(),
        },
        3,
        25,
        org,
    );
    let redemptions = RedemptionService::new(&h.ctx);
    let challenges = ChallengeService::new(&h.ctx);

    for _ in 0..2 {
        redemptions.initiate(user, coupon.id).await.unwrap();
    }
    let err = challenges.claim_reward(user, challenge.id).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::ChallengeNotCompleted));

    redemptions.initiate(user, coupon.id).await.unwrap();
    let listed = challenges.list_for_user(user).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_completed);

    let claimed = challenges.claim_reward(user, challenge.id).await.unwrap();
    assert_eq!(claimed.reward_points, 25);
    assert_eq!(h.store.points(user, org), 25);

    let err = challenges.claim_reward(user, challenge.id).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::RewardAlreadyClaimed));
    assert_eq!(h.store.points(user, org), 25);
}

#[tokio::test]
async fn test_organization_filters_and_distinct_count() {
    let h = Harness::new();
    let cafe = h.id();
    let bakery = h.id();
    let user = h.id();
    let redemptions = RedemptionService::new(&h.ctx);

    let cafe_only = h.challenge(
        ChallengeCondition::RedeemCount {
            organizations: vec![cafe],
        },
        2,
        0,
        cafe,
    );
    let explorer = h.challenge(ChallengeCondition::DifferentOrganizations, 2, 0, cafe);

    redemptions.initiate(user, h.instant_coupon(cafe).id).await.unwrap();
    redemptions.initiate(user, h.instant_coupon(bakery).id).await.unwrap();

    let progress = ChallengeService::new(&h.ctx).recompute_for_user(user).await.unwrap();
    let value_of = |id| {
        progress
            .iter()
            .find(|p| p.challenge_id == id)
            .map(|p| (p.progress_value, p.is_completed))
            .unwrap()
    };

    assert_eq!(value_of(cafe_only.id), (1, false));
    assert_eq!(value_of(explorer.id), (2, true));
}

#[tokio::test]
async fn test_total_points_challenge_stays_completed() {
    let h = Harness::new();
    let org = h.id();
    let user = h.id();
    let challenge = h.challenge(
        ChallengeCondition::TotalPoints {
            organizations: Vec::new(),
        },
        100,
        0,
        org,
    );
    let service = ChallengeService::new(&h.ctx);

    h.store.set_points(user, org, 150);
    service.recompute_for_user(user).await.unwrap();

    h.store.set_points(user, org, 10);
    let progress = service.recompute_for_user(user).await.unwrap();
    let entry = progress.iter().find(|p| p.challenge_id == challenge.id).unwrap();

    assert_eq!(entry.progress_value, 10);
    assert!(entry.is_completed);
}

// ============================================================================
// Staff and coupon management
// ============================================================================

#[tokio::test]
async fn test_coupon_management_requires_manage_permission() {
    let h = Harness::new();
    let org = h.id();
    let staff = StaffService::new(&h.ctx);
    let coupons = CouponService::new(&h.ctx);
    let request: CreateCouponRequest = serde_json::from_str(r#"{"title":"Latte"}"#).unwrap();

    let outsider = h.id();
    let err = coupons.create(outsider, org, request.clone()).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::NotStaffMember));

    let cashier = h.id();
    staff
        .add_member(org, cashier, StaffPermissions::VALIDATE_REDEMPTIONS)
        .await
        .unwrap();
    let err = coupons.create(cashier, org, request.clone()).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::MissingPermission(_)));

    let manager = h.id();
    staff
        .add_member(org, manager, StaffPermissions::MANAGE_COUPONS)
        .await
        .unwrap();
    let created = coupons.create(manager, org, request).await.unwrap();
    assert!(created.is_code_required);

    let coupon_id = created.id.parse().unwrap();
    coupons.archive(manager, coupon_id).await.unwrap();
    assert!(coupons.list(Some(org)).await.unwrap().is_empty());
    assert!(coupons.get(coupon_id).await.unwrap().is_archived);
}

#[tokio::test]
async fn test_update_can_return_caps_to_unlimited() {
    let h = Harness::new();
    let org = h.id();
    let manager = h.staff(org, StaffPermissions::MANAGE_COUPONS);
    let coupons = CouponService::new(&h.ctx);

    let request: CreateCouponRequest = serde_json::from_str(
        r#"{"title":"Latte","total_max_uses":5,"expiry_date":"2030-01-01T00:00:00Z"}"#,
    )
    .unwrap();
    let created = coupons.create(manager.user_id, org, request).await.unwrap();
    let coupon_id = created.id.parse().unwrap();

    let rename: UpdateCouponRequest = serde_json::from_str(r#"{"title":"Flat white"}"#).unwrap();
    let renamed = coupons.update(manager.user_id, coupon_id, rename).await.unwrap();
    assert_eq!(renamed.total_max_uses, Some(5));
    assert!(renamed.expiry_date.is_some());

    let clear: UpdateCouponRequest =
        serde_json::from_str(r#"{"total_max_uses":null,"expiry_date":null}"#).unwrap();
    let cleared = coupons.update(manager.user_id, coupon_id, clear).await.unwrap();
    assert_eq!(cleared.total_max_uses, None);
    assert_eq!(cleared.expiry_date, None);
    assert_eq!(cleared.title, "Flat white");

    let zero: UpdateCouponRequest = serde_json::from_str(r#"{"total_max_uses":0}"#).unwrap();
    let err = coupons.update(manager.user_id, coupon_id, zero).await.unwrap_err();
    assert!(matches!(domain(&err), DomainError::ValidationError(_)));
    assert_eq!(coupons.get(coupon_id).await.unwrap().total_max_uses, None);
}

#[tokio::test]
async fn test_custom_validity_window() {
    let settings = RedemptionSettings {
        validity_window: Duration::seconds(30),
        ..RedemptionSettings::default()
    };
    let h = Harness::with_settings(settings);
    let org = h.id();
    let coupon = h.coupon(org, |_| {});
    let staff = h.validator(org);

    let code = RedemptionService::new(&h.ctx)
        .initiate(h.id(), coupon.id)
        .await
        .unwrap()
        .code
        .unwrap();
    h.advance(31);

    let err = RedemptionService::new(&h.ctx)
        .finalize(&code, &staff)
        .await
        .unwrap_err();
    assert!(matches!(domain(&err), DomainError::Expired));
}
