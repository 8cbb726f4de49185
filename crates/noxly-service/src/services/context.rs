//! Service context - dependency container for services
//!
//! Holds all repositories, the usage feed and other dependencies needed by services.

use std::sync::Arc;

use noxly_cache::{LocalUsageFeed, UsageFeed};
use noxly_common::auth::JwtService;
use noxly_common::RedemptionConfig;
use noxly_core::traits::{
    ChallengeRepository, Clock, CouponRepository, PointRepository, StaffRepository, SystemClock,
    UsageRepository,
};
use noxly_core::{CodeSource, RandomCodeSource, Snowflake, SnowflakeGenerator, DEFAULT_VALIDITY_SECONDS};

use super::error::{ServiceError, ServiceResult};

/// Redemption timing and retry limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionSettings {
    /// How long an issued code may be finalized
    pub validity_window: chrono::Duration,
    /// Codes drawn per initiation before giving up
    pub max_code_attempts: u32,
}

impl Default for RedemptionSettings {
    fn default() -> Self {
        Self {
            validity_window: chrono::Duration::seconds(DEFAULT_VALIDITY_SECONDS),
            max_code_attempts: 5,
        }
    }
}

impl From<&RedemptionConfig> for RedemptionSettings {
    fn from(config: &RedemptionConfig) -> Self {
        Self {
            validity_window: chrono::Duration::seconds(config.code_ttl_seconds),
            max_code_attempts: config.max_code_attempts,
        }
    }
}

/// Service context containing all dependencies
///
/// Cheap to clone; background tasks own a clone.
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    coupon_repo: Arc<dyn CouponRepository>,
    usage_repo: Arc<dyn UsageRepository>,
    point_repo: Arc<dyn PointRepository>,
    challenge_repo: Arc<dyn ChallengeRepository>,
    staff_repo: Arc<dyn StaffRepository>,

    // Change feed
    usage_feed: Arc<dyn UsageFeed>,

    // Services
    jwt_service: Arc<JwtService>,
    snowflake_generator: Arc<SnowflakeGenerator>,
    clock: Arc<dyn Clock>,
    code_source: Arc<dyn CodeSource>,
    settings: RedemptionSettings,
}

impl ServiceContext {
    // === Repositories ===

    pub fn coupon_repo(&self) -> &dyn CouponRepository {
        self.coupon_repo.as_ref()
    }

    pub fn usage_repo(&self) -> &dyn UsageRepository {
        self.usage_repo.as_ref()
    }

    pub fn point_repo(&self) -> &dyn PointRepository {
        self.point_repo.as_ref()
    }

    pub fn challenge_repo(&self) -> &dyn ChallengeRepository {
        self.challenge_repo.as_ref()
    }

    pub fn staff_repo(&self) -> &dyn StaffRepository {
        self.staff_repo.as_ref()
    }

    // === Change feed ===

    pub fn usage_feed(&self) -> &dyn UsageFeed {
        self.usage_feed.as_ref()
    }

    // === Services ===

    /// Get the JWT service
    pub fn jwt_service(&self) -> &JwtService {
        self.jwt_service.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn code_source(&self) -> &dyn CodeSource {
        self.code_source.as_ref()
    }

    pub fn settings(&self) -> RedemptionSettings {
        self.settings
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builder for creating ServiceContext with custom configuration
///
/// Repositories and the JWT service are required. Everything else falls back
/// to the production default: in-process feed, system clock, random codes.
#[derive(Default)]
pub struct ServiceContextBuilder {
    coupon_repo: Option<Arc<dyn CouponRepository>>,
    usage_repo: Option<Arc<dyn UsageRepository>>,
    point_repo: Option<Arc<dyn PointRepository>>,
    challenge_repo: Option<Arc<dyn ChallengeRepository>>,
    staff_repo: Option<Arc<dyn StaffRepository>>,
    usage_feed: Option<Arc<dyn UsageFeed>>,
    jwt_service: Option<Arc<JwtService>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    clock: Option<Arc<dyn Clock>>,
    code_source: Option<Arc<dyn CodeSource>>,
    settings: RedemptionSettings,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coupon_repo(mut self, repo: Arc<dyn CouponRepository>) -> Self {
        self.coupon_repo = Some(repo);
        self
    }

    pub fn usage_repo(mut self, repo: Arc<dyn UsageRepository>) -> Self {
        self.usage_repo = Some(repo);
        self
    }

    pub fn point_repo(mut self, repo: Arc<dyn PointRepository>) -> Self {
        self.point_repo = Some(repo);
        self
    }

    pub fn challenge_repo(mut self, repo: Arc<dyn ChallengeRepository>) -> Self {
        self.challenge_repo = Some(repo);
        self
    }

    pub fn staff_repo(mut self, repo: Arc<dyn StaffRepository>) -> Self {
        self.staff_repo = Some(repo);
        self
    }

    pub fn usage_feed(mut self, feed: Arc<dyn UsageFeed>) -> Self {
        self.usage_feed = Some(feed);
        self
    }

    pub fn jwt_service(mut self, service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(service);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn code_source(mut self, source: Arc<dyn CodeSource>) -> Self {
        self.code_source = Some(source);
        self
    }

    pub fn settings(mut self, settings: RedemptionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    /// or the settings are unusable
    pub fn build(self) -> ServiceResult<ServiceContext> {
        if self.settings.validity_window <= chrono::Duration::zero() {
            return Err(ServiceError::validation("validity window must be positive"));
        }
        if self.settings.max_code_attempts == 0 {
            return Err(ServiceError::validation("max_code_attempts must be at least 1"));
        }

        Ok(ServiceContext {
            coupon_repo: self
                .coupon_repo
                .ok_or_else(|| ServiceError::validation("coupon_repo is required"))?,
            usage_repo: self
                .usage_repo
                .ok_or_else(|| ServiceError::validation("usage_repo is required"))?,
            point_repo: self
                .point_repo
                .ok_or_else(|| ServiceError::validation("point_repo is required"))?,
            challenge_repo: self
                .challenge_repo
                .ok_or_else(|| ServiceError::validation("challenge_repo is required"))?,
            staff_repo: self
                .staff_repo
                .ok_or_else(|| ServiceError::validation("staff_repo is required"))?,
            jwt_service: self
                .jwt_service
                .ok_or_else(|| ServiceError::validation("jwt_service is required"))?,
            usage_feed: self
                .usage_feed
                .unwrap_or_else(|| Arc::new(LocalUsageFeed::new())),
            snowflake_generator: self
                .snowflake_generator
                .unwrap_or_else(|| Arc::new(SnowflakeGenerator::new(0))),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            code_source: self
                .code_source
                .unwrap_or_else(|| Arc::new(RandomCodeSource)),
            settings: self.settings,
        })
    }
}
