//! Challenge service
//!
//! Measures challenge conditions against the usage ledger and point balances,
//! and pays out completed challenges exactly once.

use std::collections::HashMap;

use noxly_core::entities::{ChallengeCondition, ChallengeProgress};
use noxly_core::{DomainError, Snowflake};
use tracing::{info, instrument, warn};

use crate::dto::{ChallengeProgressResponse, ChallengeWithProgress, ClaimRewardResponse};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Challenge service
pub struct ChallengeService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ChallengeService<'a> {
    /// Create a new ChallengeService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Re-measure every active challenge for a user and store the result
    #[instrument(skip(self))]
    pub async fn recompute_for_user(&self, user_id: Snowflake) -> ServiceResult<Vec<ChallengeProgress>> {
        let challenges = self.ctx.challenge_repo().find_active().await?;
        let now = self.ctx.clock().now();
        let mut updated = Vec::with_capacity(challenges.len());

        for challenge in &challenges {
            let value = self.measure(user_id, &challenge.condition).await?;
            let progress = self
                .ctx
                .challenge_repo()
                .upsert_progress(user_id, challenge.id, value, challenge.target_value, now)
                .await?;

            if progress.completed_at == Some(now) {
                info!(
                    user_id = %user_id,
                    challenge_id = %challenge.id,
                    "Challenge completed"
                );
            }
            updated.push(progress);
        }

        Ok(updated)
    }

    async fn measure(&self, user_id: Snowflake, condition: &ChallengeCondition) -> ServiceResult<i64> {
        let value = match condition {
            ChallengeCondition::RedeemCount { organizations } => {
                self.ctx
                    .usage_repo()
                    .count_finalized_for_user(user_id, organizations)
                    .await?
            }
            ChallengeCondition::DifferentOrganizations => {
                self.ctx
                    .usage_repo()
                    .count_distinct_organizations(user_id)
                    .await?
            }
            ChallengeCondition::TotalPoints { organizations } => {
                self.ctx
                    .point_repo()
                    .total_points(user_id, organizations)
                    .await?
            }
        };
        Ok(value)
    }

    /// Active challenges with the user's stored progress
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: Snowflake) -> ServiceResult<Vec<ChallengeProgressResponse>> {
        let challenges = self.ctx.challenge_repo().find_active().await?;
        let mut progress: HashMap<Snowflake, ChallengeProgress> = self
            .ctx
            .challenge_repo()
            .list_progress(user_id)
            .await?
            .into_iter()
            .map(|p| (p.challenge_id, p))
            .collect();

        Ok(challenges
            .into_iter()
            .map(|challenge| {
                let progress = progress.remove(&challenge.id);
                ChallengeProgressResponse::from(ChallengeWithProgress { challenge, progress })
            })
            .collect())
    }

    /// Pay out a completed challenge to its reward organization
    #[instrument(skip(self))]
    pub async fn claim_reward(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
    ) -> ServiceResult<ClaimRewardResponse> {
        let challenge = self
            .ctx
            .challenge_repo()
            .find_by_id(challenge_id)
            .await?
            .ok_or(DomainError::ChallengeNotFound(challenge_id))?;

        let now = self.ctx.clock().now();
        let progress = self
            .ctx
            .challenge_repo()
            .claim_reward(user_id, challenge_id, now)
            .await?;

        info!(
            user_id = %user_id,
            challenge_id = %challenge_id,
            reward_points = challenge.reward_points,
            "Challenge reward claimed"
        );

        // the payout can move point-based challenges
        if let Err(e) = self.recompute_for_user(user_id).await {
            warn!(user_id = %user_id, error = %e, "Challenge recompute failed");
        }

        Ok(ClaimRewardResponse {
            challenge_id: challenge_id.to_string(),
            reward_points: challenge.reward_points,
            reward_organization_id: challenge.reward_organization_id.to_string(),
            claimed_at: progress.claimed_at.unwrap_or(now),
        })
    }
}
