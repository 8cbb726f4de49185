//! In-memory store implementing every repository trait
//!
//! Each trait method takes one lock for its whole body, which gives the
//! same all-or-nothing behavior the PostgreSQL repositories get from their
//! transactions and conditional updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use noxly_core::entities::{
    Challenge, ChallengeProgress, Coupon, PointBalance, StaffMember, UsageRecord,
};
use noxly_core::traits::{
    ChallengeRepository, CouponRepository, NewUsage, PointRepository, RepoResult,
    StaffRepository, UsageRepository,
};
use noxly_core::{DomainError, RedemptionCode, Snowflake};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct State {
    coupons: HashMap<Snowflake, Coupon>,
    usages: Vec<UsageRecord>,
    balances: HashMap<(Snowflake, Snowflake), PointBalance>,
    challenges: HashMap<Snowflake, Challenge>,
    progress: HashMap<(Snowflake, Snowflake), ChallengeProgress>,
    staff: HashMap<(Snowflake, Snowflake), StaffMember>,
}

impl State {
    fn points(&self, user_id: Snowflake, organization_id: Snowflake) -> i64 {
        self.balances
            .get(&(user_id, organization_id))
            .map_or(0, |b| b.points)
    }

    fn debit(&mut self, user_id: Snowflake, organization_id: Snowflake, amount: i64) -> RepoResult<()> {
        if amount <= 0 {
            return Ok(());
        }
        let available = self.points(user_id, organization_id);
        if available < amount {
            return Err(DomainError::InsufficientPoints {
                required: amount,
                available,
            });
        }
        self.credit(user_id, organization_id, -amount);
        Ok(())
    }

    fn credit(&mut self, user_id: Snowflake, organization_id: Snowflake, amount: i64) -> i64 {
        let balance = self
            .balances
            .entry((user_id, organization_id))
            .or_insert_with(|| PointBalance::empty(user_id, organization_id));
        balance.points += amount;
        balance.updated_at = Utc::now();
        balance.points
    }

    fn redeemed_count(&self, coupon_id: Snowflake, user_id: Option<Snowflake>) -> i64 {
        self.usages
            .iter()
            .filter(|u| u.coupon_id == coupon_id && u.is_used)
            .filter(|u| user_id.map_or(true, |id| u.user_id == id))
            .count() as i64
    }

    fn newest_with_code(&self, code: &RedemptionCode) -> Option<usize> {
        self.usages
            .iter()
            .enumerate()
            .filter(|(_, u)| u.redemption_code.as_ref() == Some(code))
            .max_by_key(|(_, u)| (u.redeemed_at, u.id))
            .map(|(index, _)| index)
    }

    fn record_from(usage: &NewUsage, is_used: bool) -> UsageRecord {
        UsageRecord {
            id: usage.id,
            user_id: usage.user_id,
            coupon_id: usage.coupon_id,
            organization_id: usage.organization_id,
            redemption_code: usage.code.clone(),
            redeemed_at: usage.redeemed_at,
            is_used,
            finalized_at: is_used.then_some(usage.redeemed_at),
            points_spent: usage.points_cost.max(0),
            points_awarded: if is_used { usage.points_reward.max(0) } else { 0 },
        }
    }
}

/// Shared in-memory backing for all repositories
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failing_code_lookups: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` code lookups fail with a transient error
    pub fn fail_next_code_lookups(&self, count: u32) {
        self.failing_code_lookups.store(count, Ordering::SeqCst);
    }

    pub fn put_coupon(&self, coupon: Coupon) {
        self.state.lock().coupons.insert(coupon.id, coupon);
    }

    pub fn put_challenge(&self, challenge: Challenge) {
        self.state.lock().challenges.insert(challenge.id, challenge);
    }

    pub fn put_staff(&self, member: StaffMember) {
        self.state
            .lock()
            .staff
            .insert((member.organization_id, member.user_id), member);
    }

    /// Overwrite a balance
    pub fn set_points(&self, user_id: Snowflake, organization_id: Snowflake, points: i64) {
        let mut state = self.state.lock();
        let current = state.points(user_id, organization_id);
        state.credit(user_id, organization_id, points - current);
    }

    pub fn points(&self, user_id: Snowflake, organization_id: Snowflake) -> i64 {
        self.state.lock().points(user_id, organization_id)
    }

    pub fn usage(&self, id: Snowflake) -> Option<UsageRecord> {
        self.state.lock().usages.iter().find(|u| u.id == id).cloned()
    }

    pub fn usages(&self) -> Vec<UsageRecord> {
        self.state.lock().usages.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().usages.iter().filter(|u| u.is_pending()).count()
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Coupon>> {
        Ok(self.state.lock().coupons.get(&id).cloned())
    }

    async fn list_public(
        &self,
        organization_id: Option<Snowflake>,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Coupon>> {
        let state = self.state.lock();
        let mut coupons: Vec<Coupon> = state
            .coupons
            .values()
            .filter(|c| c.is_redeemable(now))
            .filter(|c| organization_id.map_or(true, |org| c.organization_id == org))
            .cloned()
            .collect();
        coupons.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(coupons)
    }

    async fn create(&self, coupon: &Coupon) -> RepoResult<()> {
        self.state.lock().coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn update(&self, coupon: &Coupon) -> RepoResult<()> {
        let mut state = self.state.lock();
        match state.coupons.get_mut(&coupon.id) {
            Some(stored) => {
                *stored = coupon.clone();
                Ok(())
            }
            None => Err(DomainError::CouponNotFound(coupon.id)),
        }
    }

    async fn archive(&self, id: Snowflake) -> RepoResult<()> {
        let mut state = self.state.lock();
        let coupon = state
            .coupons
            .get_mut(&id)
            .ok_or(DomainError::CouponNotFound(id))?;
        coupon.archive();
        Ok(())
    }
}

#[async_trait]
impl UsageRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<UsageRecord>> {
        Ok(self.usage(id))
    }

    async fn find_by_code(&self, code: &RedemptionCode) -> RepoResult<Option<UsageRecord>> {
        let state = self.state.lock();
        Ok(state.newest_with_code(code).map(|i| state.usages[i].clone()))
    }

    async fn find_pending(
        &self,
        user_id: Snowflake,
        coupon_id: Snowflake,
    ) -> RepoResult<Option<UsageRecord>> {
        Ok(self
            .state
            .lock()
            .usages
            .iter()
            .find(|u| u.user_id == user_id && u.coupon_id == coupon_id && u.is_pending())
            .cloned())
    }

    async fn count_finalized(&self, user_id: Snowflake, coupon_id: Snowflake) -> RepoResult<i64> {
        Ok(self
            .state
            .lock()
            .usages
            .iter()
            .filter(|u| u.user_id == user_id && u.coupon_id == coupon_id && u.is_used)
            .count() as i64)
    }

    async fn count_finalized_for_coupon(&self, coupon_id: Snowflake) -> RepoResult<i64> {
        Ok(self
            .state
            .lock()
            .usages
            .iter()
            .filter(|u| u.coupon_id == coupon_id && u.is_used)
            .count() as i64)
    }

    async fn count_finalized_for_user(
        &self,
        user_id: Snowflake,
        organizations: &[Snowflake],
    ) -> RepoResult<i64> {
        Ok(self
            .state
            .lock()
            .usages
            .iter()
            .filter(|u| u.user_id == user_id && u.is_used)
            .filter(|u| organizations.is_empty() || organizations.contains(&u.organization_id))
            .count() as i64)
    }

    async fn count_distinct_organizations(&self, user_id: Snowflake) -> RepoResult<i64> {
        let state = self.state.lock();
        let mut organizations: Vec<Snowflake> = state
            .usages
            .iter()
            .filter(|u| u.user_id == user_id && u.is_used)
            .map(|u| u.organization_id)
            .collect();
        organizations.sort_unstable();
        organizations.dedup();
        Ok(organizations.len() as i64)
    }

    async fn code_exists(&self, code: &RedemptionCode, since: DateTime<Utc>) -> RepoResult<bool> {
        let failing = self
            .failing_code_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DomainError::DatabaseError("connection reset".to_string()));
        }

        Ok(self.state.lock().usages.iter().any(|u| {
            u.redemption_code.as_ref() == Some(code) && (u.is_pending() || u.redeemed_at >= since)
        }))
    }

    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<UsageRecord>> {
        let mut usages: Vec<UsageRecord> = self
            .state
            .lock()
            .usages
            .iter()
            .filter(|u| u.user_id == user_id)
            .cloned()
            .collect();
        usages.sort_by(|a, b| (b.redeemed_at, b.id).cmp(&(a.redeemed_at, a.id)));
        Ok(usages)
    }

    async fn insert_pending(&self, usage: &NewUsage) -> RepoResult<UsageRecord> {
        let mut state = self.state.lock();

        let duplicate = state.usages.iter().filter(|u| u.is_pending()).find_map(|u| {
            if u.user_id == usage.user_id && u.coupon_id == usage.coupon_id {
                Some(DomainError::AlreadyPending)
            } else if usage.code.is_some() && u.redemption_code == usage.code {
                Some(DomainError::CodeCollision)
            } else {
                None
            }
        });
        if let Some(err) = duplicate {
            return Err(err);
        }

        state.debit(usage.user_id, usage.organization_id, usage.points_cost)?;

        let record = State::record_from(usage, false);
        state.usages.push(record.clone());
        Ok(record)
    }

    async fn insert_instant(&self, usage: &NewUsage) -> RepoResult<UsageRecord> {
        let mut state = self.state.lock();

        if let Some(coupon) = state.coupons.get(&usage.coupon_id) {
            if !coupon.allows_another_use(state.redeemed_count(usage.coupon_id, Some(usage.user_id))) {
                return Err(DomainError::LimitReached {
                    max: coupon.max_uses_per_user,
                });
            }
            if coupon.is_exhausted(state.redeemed_count(usage.coupon_id, None)) {
                return Err(DomainError::CouponExhausted);
            }
        }

        state.debit(usage.user_id, usage.organization_id, usage.points_cost)?;
        if usage.points_reward > 0 {
            state.credit(usage.user_id, usage.organization_id, usage.points_reward);
        }

        let record = State::record_from(usage, true);
        state.usages.push(record.clone());
        Ok(record)
    }

    async fn finalize(
        &self,
        code: &RedemptionCode,
        organization_id: Snowflake,
        now: DateTime<Utc>,
        window: Duration,
    ) -> RepoResult<UsageRecord> {
        let mut state = self.state.lock();

        let index = state.newest_with_code(code).ok_or(DomainError::InvalidCode)?;
        let candidate = state.usages[index].clone();

        let (coupon_organization, reward) = state
            .coupons
            .get(&candidate.coupon_id)
            .map_or((candidate.organization_id, 0), |c| (c.organization_id, c.points_reward));

        if coupon_organization != organization_id {
            return Err(DomainError::WrongOrganization);
        }
        if candidate.is_used {
            return Err(DomainError::AlreadyRedeemed);
        }
        if now - candidate.redeemed_at > window {
            return Err(DomainError::Expired);
        }
        let exhausted = state
            .coupons
            .get(&candidate.coupon_id)
            .is_some_and(|c| c.is_exhausted(state.redeemed_count(candidate.coupon_id, None)));
        if exhausted {
            return Err(DomainError::CouponExhausted);
        }

        let record = &mut state.usages[index];
        record.is_used = true;
        record.finalized_at = Some(now);
        record.points_awarded = reward;
        let finalized = record.clone();

        if reward > 0 {
            state.credit(finalized.user_id, organization_id, reward);
        }

        Ok(finalized)
    }

    async fn delete_pending(&self, id: Snowflake, user_id: Snowflake) -> RepoResult<UsageRecord> {
        let mut state = self.state.lock();

        let index = state
            .usages
            .iter()
            .position(|u| u.id == id)
            .ok_or(DomainError::UsageNotFound(id))?;
        let record = state.usages[index].clone();

        if record.user_id != user_id {
            return Err(DomainError::NotUsageOwner);
        }
        if record.is_used {
            return Err(DomainError::UsageAlreadyFinalized);
        }

        state.usages.remove(index);
        if record.points_spent > 0 {
            state.credit(record.user_id, record.organization_id, record.points_spent);
        }

        Ok(record)
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<UsageRecord>> {
        let mut state = self.state.lock();

        let (purged, kept): (Vec<UsageRecord>, Vec<UsageRecord>) = std::mem::take(&mut state.usages)
            .into_iter()
            .partition(|u| u.is_pending() && u.redeemed_at < cutoff);
        state.usages = kept;

        for record in purged.iter().filter(|r| r.points_spent > 0) {
            state.credit(record.user_id, record.organization_id, record.points_spent);
        }

        Ok(purged)
    }
}

#[async_trait]
impl PointRepository for MemoryStore {
    async fn balance(&self, user_id: Snowflake, organization_id: Snowflake) -> RepoResult<i64> {
        Ok(self.points(user_id, organization_id))
    }

    async fn list_balances(&self, user_id: Snowflake) -> RepoResult<Vec<PointBalance>> {
        let mut balances: Vec<PointBalance> = self
            .state
            .lock()
            .balances
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        balances.sort_by_key(|b| b.organization_id);
        Ok(balances)
    }

    async fn total_points(
        &self,
        user_id: Snowflake,
        organizations: &[Snowflake],
    ) -> RepoResult<i64> {
        Ok(self
            .state
            .lock()
            .balances
            .values()
            .filter(|b| b.user_id == user_id)
            .filter(|b| organizations.is_empty() || organizations.contains(&b.organization_id))
            .map(|b| b.points)
            .sum())
    }

    async fn credit(
        &self,
        user_id: Snowflake,
        organization_id: Snowflake,
        amount: i64,
    ) -> RepoResult<i64> {
        Ok(self.state.lock().credit(user_id, organization_id, amount))
    }
}

#[async_trait]
impl ChallengeRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Challenge>> {
        Ok(self.state.lock().challenges.get(&id).cloned())
    }

    async fn find_active(&self) -> RepoResult<Vec<Challenge>> {
        let mut challenges: Vec<Challenge> = self
            .state
            .lock()
            .challenges
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        challenges.sort_by_key(|c| c.id);
        Ok(challenges)
    }

    async fn create(&self, challenge: &Challenge) -> RepoResult<()> {
        challenge.validate()?;
        self.put_challenge(challenge.clone());
        Ok(())
    }

    async fn find_progress(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
    ) -> RepoResult<Option<ChallengeProgress>> {
        Ok(self.state.lock().progress.get(&(user_id, challenge_id)).cloned())
    }

    async fn list_progress(&self, user_id: Snowflake) -> RepoResult<Vec<ChallengeProgress>> {
        Ok(self
            .state
            .lock()
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_progress(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
        value: i64,
        target: i64,
        now: DateTime<Utc>,
    ) -> RepoResult<ChallengeProgress> {
        let mut state = self.state.lock();
        let progress = state
            .progress
            .entry((user_id, challenge_id))
            .or_insert_with(|| ChallengeProgress::new(user_id, challenge_id, now));
        progress.record(value, target, now);
        Ok(progress.clone())
    }

    async fn claim_reward(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
        now: DateTime<Utc>,
    ) -> RepoResult<ChallengeProgress> {
        let mut state = self.state.lock();

        let challenge = state
            .challenges
            .get(&challenge_id)
            .cloned()
            .ok_or(DomainError::ChallengeNotFound(challenge_id))?;

        let progress = state
            .progress
            .get_mut(&(user_id, challenge_id))
            .ok_or(DomainError::ChallengeNotCompleted)?;
        if progress.is_reward_claimed {
            return Err(DomainError::RewardAlreadyClaimed);
        }
        if !progress.is_completed {
            return Err(DomainError::ChallengeNotCompleted);
        }

        progress.is_reward_claimed = true;
        progress.claimed_at = Some(now);
        progress.updated_at = now;
        let claimed = progress.clone();

        if challenge.reward_points > 0 {
            state.credit(user_id, challenge.reward_organization_id, challenge.reward_points);
        }

        Ok(claimed)
    }
}

#[async_trait]
impl StaffRepository for MemoryStore {
    async fn find_member(
        &self,
        organization_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<StaffMember>> {
        Ok(self.state.lock().staff.get(&(organization_id, user_id)).cloned())
    }

    async fn add_member(&self, member: &StaffMember) -> RepoResult<()> {
        self.put_staff(member.clone());
        Ok(())
    }
}
