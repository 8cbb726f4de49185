//! Test fixtures and data generators
//!
//! `Harness` wires a `ServiceContext` to the in-memory store with a manual
//! clock and a scriptable code source, and seeds coupons, staff, balances
//! and challenges.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{Duration, Utc};
use noxly_cache::LocalUsageFeed;
use noxly_common::JwtService;
use noxly_core::entities::{Challenge, ChallengeCondition, Coupon, StaffMember, StaffScope};
use noxly_core::{
    CodeSource, ManualClock, RandomCodeSource, RedemptionCode, Snowflake, SnowflakeGenerator,
    StaffPermissions,
};
use noxly_service::{RedemptionSettings, ServiceContext, ServiceContextBuilder};
use parking_lot::Mutex;

use crate::memory::MemoryStore;

/// Secret shared by the harness and the tokens it issues
pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Hands out queued codes first, random ones after
#[derive(Debug, Default)]
pub struct ScriptedCodeSource {
    queued: Mutex<VecDeque<RedemptionCode>>,
}

impl ScriptedCodeSource {
    pub fn push(&self, code: &str) {
        let code = RedemptionCode::parse(code).expect("scripted code must be six digits");
        self.queued.lock().push_back(code);
    }

    pub fn push_repeated(&self, code: &str, times: usize) {
        for _ in 0..times {
            self.push(code);
        }
    }
}

impl CodeSource for ScriptedCodeSource {
    fn next_code(&self) -> RedemptionCode {
        self.queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| RandomCodeSource.next_code())
    }
}

/// Service context over the in-memory store
pub struct Harness {
    pub ctx: ServiceContext,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub codes: Arc<ScriptedCodeSource>,
    pub feed: Arc<LocalUsageFeed>,
    ids: SnowflakeGenerator,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(RedemptionSettings::default())
    }

    pub fn with_settings(settings: RedemptionSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codes = Arc::new(ScriptedCodeSource::default());
        let feed = Arc::new(LocalUsageFeed::new());

        let ctx = ServiceContextBuilder::new()
            .coupon_repo(store.clone())
            .usage_repo(store.clone())
            .point_repo(store.clone())
            .challenge_repo(store.clone())
            .staff_repo(store.clone())
            .usage_feed(feed.clone())
            .jwt_service(Arc::new(JwtService::new(TEST_JWT_SECRET, 3600)))
            .snowflake_generator(Arc::new(SnowflakeGenerator::new(1)))
            .clock(clock.clone())
            .code_source(codes.clone())
            .settings(settings)
            .build()
            .expect("harness context");

        Self {
            ctx,
            store,
            clock,
            codes,
            feed,
            ids: SnowflakeGenerator::new(2),
        }
    }

    /// Fresh id for users and organizations
    pub fn id(&self) -> Snowflake {
        self.ids.generate()
    }

    pub fn advance(&self, seconds: i64) {
        self.clock.advance(Duration::seconds(seconds));
    }

    /// Code coupon with no limits, adjusted by `configure`
    pub fn coupon(&self, organization_id: Snowflake, configure: impl FnOnce(&mut Coupon)) -> Coupon {
        let mut coupon = Coupon::new(self.id(), organization_id, "Free coffee".to_string());
        configure(&mut coupon);
        coupon.validate().expect("fixture coupon must be valid");
        self.store.put_coupon(coupon.clone());
        coupon
    }

    pub fn instant_coupon(&self, organization_id: Snowflake) -> Coupon {
        self.coupon(organization_id, |c| c.is_code_required = false)
    }

    pub fn staff(&self, organization_id: Snowflake, permissions: StaffPermissions) -> StaffScope {
        let member = StaffMember {
            organization_id,
            user_id: self.id(),
            permissions,
            created_at: Utc::now(),
        };
        self.store.put_staff(member.clone());
        member.scope()
    }

    pub fn validator(&self, organization_id: Snowflake) -> StaffScope {
        self.staff(organization_id, StaffPermissions::VALIDATE_REDEMPTIONS)
    }

    pub fn challenge(
        &self,
        condition: ChallengeCondition,
        target_value: i64,
        reward_points: i64,
        reward_organization_id: Snowflake,
    ) -> Challenge {
        let challenge = Challenge {
            id: self.id(),
            title: "Regular".to_string(),
            description: None,
            condition,
            target_value,
            reward_points,
            reward_organization_id,
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.put_challenge(challenge.clone());
        challenge
    }

    pub fn token(&self, user_id: Snowflake) -> String {
        self.ctx
            .jwt_service()
            .issue_access_token(user_id)
            .expect("token")
    }
}
