//! PostgreSQL implementation of PointRepository
//!
//! Also hosts the debit/credit statements the usage and challenge
//! repositories run inside their own transactions.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use noxly_core::entities::PointBalance;
use noxly_core::error::DomainError;
use noxly_core::traits::{PointRepository, RepoResult};
use noxly_core::value_objects::Snowflake;

use crate::mappers::organization_ids;
use crate::models::PointBalanceModel;

use super::error::map_db_error;

/// Take `amount` from a balance, failing instead of going negative
pub(crate) async fn debit_points(
    conn: &mut PgConnection,
    user_id: Snowflake,
    organization_id: Snowflake,
    amount: i64,
) -> RepoResult<()> {
    if amount <= 0 {
        return Ok(());
    }

    let result = sqlx::query(
        r"
        UPDATE loyalty_point_balances
        SET points = points - $3, updated_at = NOW()
        WHERE user_id = $1 AND organization_id = $2 AND points >= $3
        ",
    )
    .bind(user_id.into_inner())
    .bind(organization_id.into_inner())
    .bind(amount)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;

    if result.rows_affected() == 0 {
        let available = sqlx::query_scalar::<_, i64>(
            r"
            SELECT points FROM loyalty_point_balances
            WHERE user_id = $1 AND organization_id = $2
            ",
        )
        .bind(user_id.into_inner())
        .bind(organization_id.into_inner())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?
        .unwrap_or(0);

        return Err(DomainError::InsufficientPoints {
            required: amount,
            available,
        });
    }

    Ok(())
}

/// Add `amount` to a balance, creating it on first credit; returns the new balance
pub(crate) async fn credit_points(
    conn: &mut PgConnection,
    user_id: Snowflake,
    organization_id: Snowflake,
    amount: i64,
) -> RepoResult<i64> {
    sqlx::query_scalar::<_, i64>(
        r"
        INSERT INTO loyalty_point_balances (user_id, organization_id, points, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (user_id, organization_id)
        DO UPDATE SET points = loyalty_point_balances.points + EXCLUDED.points,
                      updated_at = NOW()
        RETURNING points
        ",
    )
    .bind(user_id.into_inner())
    .bind(organization_id.into_inner())
    .bind(amount)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

/// PostgreSQL implementation of PointRepository
#[derive(Clone)]
pub struct PgPointRepository {
    pool: PgPool,
}

impl PgPointRepository {
    /// Create a new PgPointRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PointRepository for PgPointRepository {
    #[instrument(skip(self))]
    async fn balance(&self, user_id: Snowflake, organization_id: Snowflake) -> RepoResult<i64> {
        let points = sqlx::query_scalar::<_, i64>(
            r"
            SELECT points FROM loyalty_point_balances
            WHERE user_id = $1 AND organization_id = $2
            ",
        )
        .bind(user_id.into_inner())
        .bind(organization_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(points.unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn list_balances(&self, user_id: Snowflake) -> RepoResult<Vec<PointBalance>> {
        let results = sqlx::query_as::<_, PointBalanceModel>(
            r"
            SELECT user_id, organization_id, points, updated_at
            FROM loyalty_point_balances
            WHERE user_id = $1
            ORDER BY organization_id
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(PointBalance::from).collect())
    }

    #[instrument(skip(self))]
    async fn total_points(
        &self,
        user_id: Snowflake,
        organizations: &[Snowflake],
    ) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r"
            SELECT COALESCE(SUM(points), 0)::BIGINT
            FROM loyalty_point_balances
            WHERE user_id = $1
              AND (cardinality($2::BIGINT[]) = 0 OR organization_id = ANY($2))
            ",
        )
        .bind(user_id.into_inner())
        .bind(organization_ids(organizations))
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn credit(
        &self,
        user_id: Snowflake,
        organization_id: Snowflake,
        amount: i64,
    ) -> RepoResult<i64> {
        if amount < 0 {
            return Err(DomainError::ValidationError(
                "credit amount must not be negative".to_string(),
            ));
        }
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        credit_points(&mut conn, user_id, organization_id, amount).await
    }
}
