//! PostgreSQL implementation of ChallengeRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use noxly_core::entities::{Challenge, ChallengeProgress};
use noxly_core::error::DomainError;
use noxly_core::traits::{ChallengeRepository, RepoResult};
use noxly_core::value_objects::Snowflake;

use crate::mappers::ChallengeInsert;
use crate::models::{ChallengeModel, ChallengeProgressModel};

use super::error::{challenge_not_found, map_db_error};
use super::points::credit_points;

const CHALLENGE_COLUMNS: &str = r"
    id, title, description, condition_type, organization_ids, target_value, reward_points,
    reward_organization_id, is_active, created_at
";

const PROGRESS_COLUMNS: &str = r"
    user_id, challenge_id, progress_value, is_completed, is_reward_claimed, completed_at,
    claimed_at, updated_at
";

/// PostgreSQL implementation of ChallengeRepository
#[derive(Clone)]
pub struct PgChallengeRepository {
    pool: PgPool,
}

impl PgChallengeRepository {
    /// Create a new PgChallengeRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChallengeRepository for PgChallengeRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Challenge>> {
        let result = sqlx::query_as::<_, ChallengeModel>(&format!(
            "SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Challenge::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_active(&self) -> RepoResult<Vec<Challenge>> {
        let results = sqlx::query_as::<_, ChallengeModel>(&format!(
            "SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE is_active ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Challenge::try_from).collect()
    }

    #[instrument(skip(self, challenge), fields(challenge_id = %challenge.id))]
    async fn create(&self, challenge: &Challenge) -> RepoResult<()> {
        let insert = ChallengeInsert::new(challenge);

        sqlx::query(
            r"
            INSERT INTO challenges (id, title, description, condition_type, organization_ids,
                target_value, reward_points, reward_organization_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(insert.id)
        .bind(insert.title)
        .bind(insert.description)
        .bind(insert.condition_type)
        .bind(&insert.organization_ids)
        .bind(insert.target_value)
        .bind(insert.reward_points)
        .bind(insert.reward_organization_id)
        .bind(insert.is_active)
        .bind(challenge.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_progress(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
    ) -> RepoResult<Option<ChallengeProgress>> {
        let result = sqlx::query_as::<_, ChallengeProgressModel>(&format!(
            r"
            SELECT {PROGRESS_COLUMNS} FROM challenge_progress
            WHERE user_id = $1 AND challenge_id = $2
            "
        ))
        .bind(user_id.into_inner())
        .bind(challenge_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(ChallengeProgress::from))
    }

    #[instrument(skip(self))]
    async fn list_progress(&self, user_id: Snowflake) -> RepoResult<Vec<ChallengeProgress>> {
        let results = sqlx::query_as::<_, ChallengeProgressModel>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM challenge_progress WHERE user_id = $1"
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(ChallengeProgress::from).collect())
    }

    #[instrument(skip(self))]
    async fn upsert_progress(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
        value: i64,
        target: i64,
        now: DateTime<Utc>,
    ) -> RepoResult<ChallengeProgress> {
        // completion is sticky: never cleared once set
        let model = sqlx::query_as::<_, ChallengeProgressModel>(&format!(
            r"
            INSERT INTO challenge_progress (user_id, challenge_id, progress_value, is_completed,
                completed_at, updated_at)
            VALUES ($1, $2, $3, $3 >= $4, CASE WHEN $3 >= $4 THEN $5 END, $5)
            ON CONFLICT (user_id, challenge_id) DO UPDATE SET
                progress_value = EXCLUDED.progress_value,
                is_completed = challenge_progress.is_completed OR EXCLUDED.is_completed,
                completed_at = COALESCE(challenge_progress.completed_at, EXCLUDED.completed_at),
                updated_at = EXCLUDED.updated_at
            RETURNING {PROGRESS_COLUMNS}
            "
        ))
        .bind(user_id.into_inner())
        .bind(challenge_id.into_inner())
        .bind(value)
        .bind(target)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ChallengeProgress::from(model))
    }

    #[instrument(skip(self))]
    async fn claim_reward(
        &self,
        user_id: Snowflake,
        challenge_id: Snowflake,
        now: DateTime<Utc>,
    ) -> RepoResult<ChallengeProgress> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let challenge = sqlx::query_as::<_, ChallengeModel>(&format!(
            "SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = $1"
        ))
        .bind(challenge_id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| challenge_not_found(challenge_id))?;

        let claimed = sqlx::query_as::<_, ChallengeProgressModel>(&format!(
            r"
            UPDATE challenge_progress
            SET is_reward_claimed = TRUE, claimed_at = $3, updated_at = $3
            WHERE user_id = $1 AND challenge_id = $2
              AND is_completed AND NOT is_reward_claimed
            RETURNING {PROGRESS_COLUMNS}
            "
        ))
        .bind(user_id.into_inner())
        .bind(challenge_id.into_inner())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let Some(claimed) = claimed else {
            let already_claimed = sqlx::query_scalar::<_, bool>(
                r"
                SELECT is_reward_claimed FROM challenge_progress
                WHERE user_id = $1 AND challenge_id = $2
                ",
            )
            .bind(user_id.into_inner())
            .bind(challenge_id.into_inner())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
            .unwrap_or(false);

            return Err(if already_claimed {
                DomainError::RewardAlreadyClaimed
            } else {
                DomainError::ChallengeNotCompleted
            });
        };

        if challenge.reward_points > 0 {
            credit_points(
                &mut tx,
                user_id,
                Snowflake::new(challenge.reward_organization_id),
                challenge.reward_points,
            )
            .await?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(ChallengeProgress::from(claimed))
    }
}
