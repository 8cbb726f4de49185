//! Redemption service
//!
//! Drives a coupon usage through its lifecycle: a consumer initiates, a code
//! is shown for a bounded window, staff finalize it, and anything left pending
//! past the window is discarded with its reserved points refunded.

use noxly_core::entities::{Coupon, StaffScope, UsageRecord};
use noxly_core::traits::NewUsage;
use noxly_core::{DomainError, RedemptionCode, Snowflake, StaffPermissions, UsageChange};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::dto::{
    FinalizedRedemptionResponse, InitiatedRedemptionResponse, PendingUsageResponse,
    RedemptionMode, UsageStatusResponse,
};

use super::challenge::ChallengeService;
use super::context::ServiceContext;
use super::error::ServiceResult;

/// Redemption service
pub struct RedemptionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RedemptionService<'a> {
    /// Create a new RedemptionService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Start a redemption of `coupon_id` for `user_id`.
    ///
    /// Code-based coupons get a pending usage holding a fresh 6-digit code.
    /// Instant coupons are finalized on the spot. Any `points_cost` is
    /// debited here; `points_reward` is credited at finalization.
    #[instrument(skip(self))]
    pub async fn initiate(
        &self,
        user_id: Snowflake,
        coupon_id: Snowflake,
    ) -> ServiceResult<InitiatedRedemptionResponse> {
        if user_id.is_zero() {
            return Err(DomainError::Unauthorized.into());
        }

        let now = self.ctx.clock().now();
        let window = self.ctx.settings().validity_window;

        let coupon = self
            .ctx
            .coupon_repo()
            .find_by_id(coupon_id)
            .await?
            .ok_or(DomainError::CouponNotFound(coupon_id))?;

        if !coupon.is_redeemable(now) {
            return Err(DomainError::CouponUnavailable.into());
        }

        if coupon.is_code_required {
            if let Some(pending) = self.ctx.usage_repo().find_pending(user_id, coupon_id).await? {
                if !pending.is_expired(now, window) {
                    return Err(DomainError::AlreadyPending.into());
                }
                // stale row the sweeper has not reached yet
                self.discard(&pending).await?;
            }
        }

        let used = self.ctx.usage_repo().count_finalized(user_id, coupon_id).await?;
        if !coupon.allows_another_use(used) {
            return Err(DomainError::LimitReached {
                max: coupon.max_uses_per_user,
            }
            .into());
        }

        if coupon.total_max_uses.is_some() {
            let redeemed = self
                .ctx
                .usage_repo()
                .count_finalized_for_coupon(coupon_id)
                .await?;
            if coupon.is_exhausted(redeemed) {
                return Err(DomainError::CouponExhausted.into());
            }
        }

        if coupon.points_cost > 0 {
            let available = self
                .ctx
                .point_repo()
                .balance(user_id, coupon.organization_id)
                .await?;
            if available < coupon.points_cost {
                return Err(DomainError::InsufficientPoints {
                    required: coupon.points_cost,
                    available,
                }
                .into());
            }
        }

        let (record, mode) = if coupon.is_code_required {
            (self.issue_code(&coupon, user_id, now).await?, RedemptionMode::Code)
        } else {
            let usage = self.new_usage(&coupon, user_id, None, now);
            (
                self.ctx.usage_repo().insert_instant(&usage).await?,
                RedemptionMode::Instant,
            )
        };

        let balance = self
            .ctx
            .point_repo()
            .balance(user_id, coupon.organization_id)
            .await?;

        self.ctx
            .usage_feed()
            .publish(&UsageChange::created(&record))
            .await;

        if mode == RedemptionMode::Instant {
            self.refresh_challenges(user_id).await;
        }

        info!(
            usage_id = %record.id,
            coupon_id = %coupon_id,
            user_id = %user_id,
            mode = ?mode,
            points_spent = record.points_spent,
            "Redemption initiated"
        );

        Ok(InitiatedRedemptionResponse {
            usage_id: record.id.to_string(),
            coupon_id: coupon_id.to_string(),
            code: record.redemption_code.as_ref().map(ToString::to_string),
            expires_at: (mode == RedemptionMode::Code).then(|| record.expires_at(window)),
            mode,
            points_spent: record.points_spent,
            points_awarded: record.points_awarded,
            balance,
        })
    }

    /// Draw codes until one is free, then insert the pending row.
    ///
    /// A taken code, an insert losing a collision race, and a transient store
    /// failure each consume one attempt.
    async fn issue_code(
        &self,
        coupon: &Coupon,
        user_id: Snowflake,
        now: DateTime<Utc>,
    ) -> ServiceResult<UsageRecord> {
        let settings = self.ctx.settings();
        let since = now - settings.validity_window;

        for attempt in 1..=settings.max_code_attempts {
            let code = self.ctx.code_source().next_code();

            match self.ctx.usage_repo().code_exists(&code, since).await {
                Ok(false) => {}
                Ok(true) => {
                    debug!(attempt, "Redemption code already live");
                    continue;
                }
                Err(e) if e.is_transient() => {
                    warn!(attempt, error = %e, "Code lookup failed");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let usage = self.new_usage(coupon, user_id, Some(code), now);
            match self.ctx.usage_repo().insert_pending(&usage).await {
                Ok(record) => return Ok(record),
                Err(DomainError::CodeCollision) => {
                    debug!(attempt, "Redemption code taken concurrently");
                }
                Err(e) if e.is_transient() => {
                    warn!(attempt, error = %e, "Pending insert failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            coupon_id = %coupon.id,
            attempts = settings.max_code_attempts,
            "Could not issue a redemption code"
        );
        Err(DomainError::CodeGenerationFailed {
            attempts: settings.max_code_attempts,
        }
        .into())
    }

    fn new_usage(
        &self,
        coupon: &Coupon,
        user_id: Snowflake,
        code: Option<RedemptionCode>,
        now: DateTime<Utc>,
    ) -> NewUsage {
        NewUsage {
            id: self.ctx.generate_id(),
            user_id,
            coupon_id: coupon.id,
            organization_id: coupon.organization_id,
            code,
            redeemed_at: now,
            points_cost: coupon.points_cost,
            points_reward: coupon.points_reward,
        }
    }

    /// Staff confirm a code shown by a consumer.
    ///
    /// Exactly one of any number of concurrent calls for the same code
    /// succeeds; the rest get `AlreadyRedeemed`.
    #[instrument(skip(self, code, scope), fields(organization_id = %scope.organization_id, staff_id = %scope.user_id))]
    pub async fn finalize(
        &self,
        code: &str,
        scope: &StaffScope,
    ) -> ServiceResult<FinalizedRedemptionResponse> {
        scope.require(StaffPermissions::VALIDATE_REDEMPTIONS)?;
        let code = RedemptionCode::parse(code)?;

        let now = self.ctx.clock().now();
        let record = self
            .ctx
            .usage_repo()
            .finalize(
                &code,
                scope.organization_id,
                now,
                self.ctx.settings().validity_window,
            )
            .await?;

        self.ctx
            .usage_feed()
            .publish(&UsageChange::finalized(&record))
            .await;
        self.refresh_challenges(record.user_id).await;

        info!(
            usage_id = %record.id,
            user_id = %record.user_id,
            coupon_id = %record.coupon_id,
            reward_points = record.points_awarded,
            "Redemption finalized"
        );

        Ok(FinalizedRedemptionResponse {
            success: true,
            usage_id: record.id.to_string(),
            user_id: record.user_id.to_string(),
            coupon_id: record.coupon_id.to_string(),
            reward_points: record.points_awarded,
            finalized_at: record.finalized_at.unwrap_or(now),
        })
    }

    /// Pending and finalized usage of one coupon for the consumer
    #[instrument(skip(self))]
    pub async fn usage_status(
        &self,
        user_id: Snowflake,
        coupon_id: Snowflake,
    ) -> ServiceResult<UsageStatusResponse> {
        let coupon = self
            .ctx
            .coupon_repo()
            .find_by_id(coupon_id)
            .await?
            .ok_or(DomainError::CouponNotFound(coupon_id))?;

        let now = self.ctx.clock().now();
        let window = self.ctx.settings().validity_window;

        let pending = self
            .ctx
            .usage_repo()
            .find_pending(user_id, coupon_id)
            .await?
            .filter(|record| !record.is_expired(now, window));
        let used_count = self.ctx.usage_repo().count_finalized(user_id, coupon_id).await?;

        Ok(UsageStatusResponse {
            pending: pending.is_some(),
            pending_usage: pending.map(|record| PendingUsageResponse {
                usage_id: record.id.to_string(),
                code: record.redemption_code.as_ref().map(ToString::to_string),
                redeemed_at: record.redeemed_at,
                expires_at: record.expires_at(window),
                remaining_seconds: record.remaining_seconds(now, window),
            }),
            used_count,
            max_uses_per_user: coupon.max_uses_per_user,
            remaining_uses: coupon.remaining_uses(used_count),
        })
    }

    /// Consumer withdraws a pending usage; any reserved points are refunded
    #[instrument(skip(self))]
    pub async fn cancel_pending(&self, user_id: Snowflake, usage_id: Snowflake) -> ServiceResult<()> {
        let record = self.ctx.usage_repo().delete_pending(usage_id, user_id).await?;
        self.announce_removal(&record).await;

        info!(
            usage_id = %usage_id,
            user_id = %user_id,
            refunded = record.points_spent,
            "Pending redemption cancelled"
        );

        Ok(())
    }

    /// Remove every pending usage older than the window, refunding each
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> ServiceResult<usize> {
        let cutoff = self.ctx.clock().now() - self.ctx.settings().validity_window;
        let purged = self.ctx.usage_repo().purge_expired(cutoff).await?;

        for record in &purged {
            self.announce_removal(record).await;
        }

        Ok(purged.len())
    }

    async fn discard(&self, record: &UsageRecord) -> ServiceResult<()> {
        match self.ctx.usage_repo().delete_pending(record.id, record.user_id).await {
            Ok(removed) => {
                self.announce_removal(&removed).await;
                info!(usage_id = %record.id, refunded = removed.points_spent, "Expired redemption discarded");
                Ok(())
            }
            // already swept
            Err(DomainError::UsageNotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn announce_removal(&self, record: &UsageRecord) {
        self.ctx
            .usage_feed()
            .publish(&UsageChange::deleted(record))
            .await;
    }

    /// Challenge progress follows finalized usage; a failure here never
    /// undoes the redemption that triggered it
    async fn refresh_challenges(&self, user_id: Snowflake) {
        if let Err(e) = ChallengeService::new(self.ctx).recompute_for_user(user_id).await {
            warn!(user_id = %user_id, error = %e, "Challenge recompute failed");
        }
    }
}
