//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Operations that must be atomic (reserving
//! points while inserting a usage, finalizing a code, claiming a reward)
//! are single trait methods so each implementation can run them in one
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::entities::{
    Challenge, ChallengeProgress, Coupon, PointBalance, StaffMember, UsageRecord,
};
use crate::error::DomainError;
use crate::value_objects::{RedemptionCode, Snowflake};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Coupon Repository
// ============================================================================

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Find coupon by ID, archived coupons included
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Coupon>>;

    /// Redeemable coupons, optionally for one organization
    async fn list_public(
        &self,
        organization_id: Option<Snowflake>,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Coupon>>;

    /// Create a new coupon
    async fn create(&self, coupon: &Coupon) -> RepoResult<()>;

    /// Update an existing coupon
    async fn update(&self, coupon: &Coupon) -> RepoResult<()>;

    /// Archive a coupon; the row is kept for the ledger
    async fn archive(&self, id: Snowflake) -> RepoResult<()>;
}

// ============================================================================
// Usage Repository
// ============================================================================

/// Row to insert on initiation
#[derive(Debug, Clone)]
pub struct NewUsage {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub coupon_id: Snowflake,
    pub organization_id: Snowflake,
    /// `None` for instant redemptions
    pub code: Option<RedemptionCode>,
    pub redeemed_at: DateTime<Utc>,
    pub points_cost: i64,
    /// Credited immediately for instant redemptions, ignored for pending ones
    pub points_reward: i64,
}

#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Find usage by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<UsageRecord>>;

    /// Newest record carrying `code`
    async fn find_by_code(&self, code: &RedemptionCode) -> RepoResult<Option<UsageRecord>>;

    /// Pending record for (user, coupon)
    async fn find_pending(
        &self,
        user_id: Snowflake,
        coupon_id: Snowflake,
    ) -> RepoResult<Option<UsageRecord>>;

    /// Finalized records for (user, coupon)
    async fn count_finalized(&self, user_id: Snowflake, coupon_id: Snowflake) -> RepoResult<i64>;

    /// Finalized records for a coupon across all users
    async fn count_finalized_for_coupon(&self, coupon_id: Snowflake) -> RepoResult<i64>;

    /// Finalized records for a user, limited to `organizations` when non-empty
    async fn count_finalized_for_user(
        &self,
        user_id: Snowflake,
        organizations: &[Snowflake],
    ) -> RepoResult<i64>;

    /// Distinct organizations with at least one finalized record for the user
    async fn count_distinct_organizations(&self, user_id: Snowflake) -> RepoResult<i64>;

    /// Whether `code` is live: held by a pending record or issued at/after `since`
    async fn code_exists(&self, code: &RedemptionCode, since: DateTime<Utc>) -> RepoResult<bool>;

    /// All records of a user, newest first
    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<UsageRecord>>;

    /// Insert a pending record and reserve `points_cost` in one transaction.
    ///
    /// Fails with `InsufficientPoints` when the conditional debit finds too
    /// few points, `AlreadyPending` when (user, coupon) already has a pending
    /// record and `CodeCollision` when another pending record holds the code.
    async fn insert_pending(&self, usage: &NewUsage) -> RepoResult<UsageRecord>;

    /// Insert a finalized record, debit cost and credit reward in one transaction
    async fn insert_instant(&self, usage: &NewUsage) -> RepoResult<UsageRecord>;

    /// Finalize the newest record carrying `code` in one transaction.
    ///
    /// Checks run in order: `InvalidCode`, `WrongOrganization`,
    /// `AlreadyRedeemed`, `Expired`. The flip itself is conditional on
    /// `is_used = FALSE`; losing that race is `AlreadyRedeemed`. The coupon's
    /// reward is credited to the user's balance at the coupon organization.
    async fn finalize(
        &self,
        code: &RedemptionCode,
        organization_id: Snowflake,
        now: DateTime<Utc>,
        window: Duration,
    ) -> RepoResult<UsageRecord>;

    /// Delete a pending record owned by `user_id` and refund its reservation
    async fn delete_pending(&self, id: Snowflake, user_id: Snowflake) -> RepoResult<UsageRecord>;

    /// Delete pending records issued before `cutoff`, refunding each
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<UsageRecord>>;
}

// ============================================================================
// Point Repository
// ============================================================================

#[async_trait]
pub trait PointRepository: Send + Sync {
    /// Current balance, 0 when the user never earned points there
    async fn balance(&self, user_id: Snowflake, organization_id: Snowflake) -> RepoResult<i64>;

    /// All balances of a user
    async fn list_balances(&self, user_id: Snowflake) -> RepoResult<Vec<PointBalance>>;

    /// Sum of balances, limited to `organizations` when non-empty
    async fn total_points(&self, user_id: Snowflake, organizations: &[Snowflake])
        -> RepoResult<i64>;

    /// Add `amount` and return the new balance
    async fn credit(
        &self,
        user_id: Snowflake,
        organization_id: Snowflake,
        amount: i64,
    ) -> RepoResult<i64>;
}

// ============================================================================
// Challenge Repository
// ============================================================================

#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// Find challenge by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Challenge>>;

    /// Active challenges
    async fn find_active(&self) -> RepoResult<Vec<Challenge>>;

    /// Create a new challenge
    async fn create(&self, challenge: &Challenge) -> RepoResult<()>;

    /// Progress row for (user, challenge)
    async fn find_progress(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
    ) -> RepoResult<Option<ChallengeProgress>>;

    /// All progress rows of a user
    async fn list_progress(&self, user_id: Snowflake) -> RepoResult<Vec<ChallengeProgress>>;

    /// Store a measurement; completion is set once `value >= target` and never cleared
    async fn upsert_progress(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
        value: i64,
        target: i64,
        now: DateTime<Utc>,
    ) -> RepoResult<ChallengeProgress>;

    /// Mark the reward claimed and credit it in one transaction.
    ///
    /// Errors: `ChallengeNotFound`, `ChallengeNotCompleted`,
    /// `RewardAlreadyClaimed`.
    async fn claim_reward(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
        now: DateTime<Utc>,
    ) -> RepoResult<ChallengeProgress>;
}

// ============================================================================
// Staff Repository
// ============================================================================

#[async_trait]
pub trait StaffRepository: Send + Sync {
    /// Membership of `user_id` in `organization_id`
    async fn find_member(
        &self,
        organization_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<StaffMember>>;

    /// Add or replace a membership
    async fn add_member(&self, member: &StaffMember) -> RepoResult<()>;
}
