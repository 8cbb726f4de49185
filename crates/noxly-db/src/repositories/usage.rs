//! PostgreSQL implementation of UsageRepository
//!
//! Every state change on the ledger runs in one transaction together with
//! its balance movement, so a reservation, a reward or a refund can never be
//! observed without the usage row that caused it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use noxly_core::entities::UsageRecord;
use noxly_core::error::DomainError;
use noxly_core::traits::{NewUsage, RepoResult, UsageRepository};
use noxly_core::value_objects::{RedemptionCode, Snowflake};

use crate::mappers::organization_ids;
use crate::models::{CouponCapsModel, UsageForFinalizeModel, UsageModel};

use super::error::{coupon_not_found, map_db_error, map_pending_insert_error, usage_not_found};
use super::points::{credit_points, debit_points};

const USAGE_COLUMNS: &str = r"
    id, user_id, coupon_id, organization_id, redemption_code, redeemed_at, is_used,
    finalized_at, points_spent, points_awarded
";

/// Lock the coupon row and read its caps.
///
/// Every writer of a finalized row takes this lock first, so the counts read
/// after it stay valid until the transaction ends.
async fn lock_coupon_caps(
    conn: &mut PgConnection,
    coupon_id: Snowflake,
) -> RepoResult<CouponCapsModel> {
    sqlx::query_as::<_, CouponCapsModel>(
        "SELECT max_uses_per_user, total_max_uses FROM coupons WHERE id = $1 FOR UPDATE",
    )
    .bind(coupon_id.into_inner())
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?
    .ok_or_else(|| coupon_not_found(coupon_id))
}

async fn ensure_total_cap(
    conn: &mut PgConnection,
    coupon_id: Snowflake,
    caps: &CouponCapsModel,
) -> RepoResult<()> {
    let Some(total) = caps.total_max_uses else {
        return Ok(());
    };

    let redeemed = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1 AND is_used",
    )
    .bind(coupon_id.into_inner())
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)?;

    if redeemed >= i64::from(total) {
        return Err(DomainError::CouponExhausted);
    }
    Ok(())
}

async fn ensure_user_cap(
    conn: &mut PgConnection,
    user_id: Snowflake,
    coupon_id: Snowflake,
    caps: &CouponCapsModel,
) -> RepoResult<()> {
    if caps.max_uses_per_user <= 0 {
        return Ok(());
    }

    let used = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM coupon_usages WHERE user_id = $1 AND coupon_id = $2 AND is_used",
    )
    .bind(user_id.into_inner())
    .bind(coupon_id.into_inner())
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)?;

    if used >= i64::from(caps.max_uses_per_user) {
        return Err(DomainError::LimitReached {
            max: caps.max_uses_per_user,
        });
    }
    Ok(())
}

/// PostgreSQL implementation of UsageRepository
#[derive(Clone)]
pub struct PgUsageRepository {
    pool: PgPool,
}

impl PgUsageRepository {
    /// Create a new PgUsageRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRepository for PgUsageRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<UsageRecord>> {
        let result = sqlx::query_as::<_, UsageModel>(&format!(
            "SELECT {USAGE_COLUMNS} FROM coupon_usages WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(UsageRecord::from))
    }

    #[instrument(skip(self))]
    async fn find_by_code(&self, code: &RedemptionCode) -> RepoResult<Option<UsageRecord>> {
        let result = sqlx::query_as::<_, UsageModel>(&format!(
            r"
            SELECT {USAGE_COLUMNS} FROM coupon_usages
            WHERE redemption_code = $1
            ORDER BY redeemed_at DESC, id DESC
            LIMIT 1
            "
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(UsageRecord::from))
    }

    #[instrument(skip(self))]
    async fn find_pending(
        &self,
        user_id: Snowflake,
        coupon_id: Snowflake,
    ) -> RepoResult<Option<UsageRecord>> {
        let result = sqlx::query_as::<_, UsageModel>(&format!(
            r"
            SELECT {USAGE_COLUMNS} FROM coupon_usages
            WHERE user_id = $1 AND coupon_id = $2 AND NOT is_used
            "
        ))
        .bind(user_id.into_inner())
        .bind(coupon_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(UsageRecord::from))
    }

    #[instrument(skip(self))]
    async fn count_finalized(&self, user_id: Snowflake, coupon_id: Snowflake) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM coupon_usages
            WHERE user_id = $1 AND coupon_id = $2 AND is_used
            ",
        )
        .bind(user_id.into_inner())
        .bind(coupon_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn count_finalized_for_coupon(&self, coupon_id: Snowflake) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM coupon_usages
            WHERE coupon_id = $1 AND is_used
            ",
        )
        .bind(coupon_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn count_finalized_for_user(
        &self,
        user_id: Snowflake,
        organizations: &[Snowflake],
    ) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM coupon_usages
            WHERE user_id = $1 AND is_used
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
    async fn count_distinct_organizations(&self, user_id: Snowflake) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(DISTINCT organization_id) FROM coupon_usages
            WHERE user_id = $1 AND is_used
            ",
        )
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn code_exists(&self, code: &RedemptionCode, since: DateTime<Utc>) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(
                SELECT 1 FROM coupon_usages
                WHERE redemption_code = $1 AND (NOT is_used OR redeemed_at >= $2)
            )
            ",
        )
        .bind(code.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<UsageRecord>> {
        let results = sqlx::query_as::<_, UsageModel>(&format!(
            r"
            SELECT {USAGE_COLUMNS} FROM coupon_usages
            WHERE user_id = $1
            ORDER BY redeemed_at DESC, id DESC
            "
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(UsageRecord::from).collect())
    }

    #[instrument(skip(self, usage), fields(usage_id = %usage.id, user_id = %usage.user_id))]
    async fn insert_pending(&self, usage: &NewUsage) -> RepoResult<UsageRecord> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        debit_points(&mut tx, usage.user_id, usage.organization_id, usage.points_cost).await?;

        let model = sqlx::query_as::<_, UsageModel>(&format!(
            r"
            INSERT INTO coupon_usages (id, user_id, coupon_id, organization_id, redemption_code,
                redeemed_at, is_used, points_spent, points_awarded)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, 0)
            RETURNING {USAGE_COLUMNS}
            "
        ))
        .bind(usage.id.into_inner())
        .bind(usage.user_id.into_inner())
        .bind(usage.coupon_id.into_inner())
        .bind(usage.organization_id.into_inner())
        .bind(usage.code.as_ref().map(RedemptionCode::as_str))
        .bind(usage.redeemed_at)
        .bind(usage.points_cost)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_pending_insert_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(UsageRecord::from(model))
    }

    #[instrument(skip(self, usage), fields(usage_id = %usage.id, user_id = %usage.user_id))]
    async fn insert_instant(&self, usage: &NewUsage) -> RepoResult<UsageRecord> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Instant rows are born finalized, no partial index backs the caps
        let caps = lock_coupon_caps(&mut tx, usage.coupon_id).await?;
        ensure_user_cap(&mut tx, usage.user_id, usage.coupon_id, &caps).await?;
        ensure_total_cap(&mut tx, usage.coupon_id, &caps).await?;

        debit_points(&mut tx, usage.user_id, usage.organization_id, usage.points_cost).await?;

        let model = sqlx::query_as::<_, UsageModel>(&format!(
            r"
            INSERT INTO coupon_usages (id, user_id, coupon_id, organization_id, redemption_code,
                redeemed_at, is_used, finalized_at, points_spent, points_awarded)
            VALUES ($1, $2, $3, $4, NULL, $5, TRUE, $5, $6, $7)
            RETURNING {USAGE_COLUMNS}
            "
        ))
        .bind(usage.id.into_inner())
        .bind(usage.user_id.into_inner())
        .bind(usage.coupon_id.into_inner())
        .bind(usage.organization_id.into_inner())
        .bind(usage.redeemed_at)
        .bind(usage.points_cost)
        .bind(usage.points_reward)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if usage.points_reward > 0 {
            credit_points(&mut tx, usage.user_id, usage.organization_id, usage.points_reward)
                .await?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(UsageRecord::from(model))
    }

    #[instrument(skip(self, code))]
    async fn finalize(
        &self,
        code: &RedemptionCode,
        organization_id: Snowflake,
        now: DateTime<Utc>,
        window: Duration,
    ) -> RepoResult<UsageRecord> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let candidate = sqlx::query_as::<_, UsageForFinalizeModel>(
            r"
            SELECT u.id, u.user_id, u.coupon_id, u.redeemed_at, u.is_used,
                   c.organization_id AS coupon_organization_id, c.points_reward
            FROM coupon_usages u
            JOIN coupons c ON c.id = u.coupon_id
            WHERE u.redemption_code = $1
            ORDER BY u.redeemed_at DESC, u.id DESC
            LIMIT 1
            ",
        )
        .bind(code.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or(DomainError::InvalidCode)?;

        if candidate.coupon_organization_id != organization_id.into_inner() {
            return Err(DomainError::WrongOrganization);
        }
        if candidate.is_used {
            return Err(DomainError::AlreadyRedeemed);
        }
        if now - candidate.redeemed_at > window {
            return Err(DomainError::Expired);
        }

        let coupon_id = Snowflake::new(candidate.coupon_id);
        let caps = lock_coupon_caps(&mut tx, coupon_id).await?;
        ensure_total_cap(&mut tx, coupon_id, &caps).await?;

        // Sole arbiter between concurrent finalizers
        let model = sqlx::query_as::<_, UsageModel>(&format!(
            r"
            UPDATE coupon_usages
            SET is_used = TRUE, finalized_at = $2, points_awarded = $3
            WHERE id = $1 AND is_used = FALSE
            RETURNING {USAGE_COLUMNS}
            "
        ))
        .bind(candidate.id)
        .bind(now)
        .bind(candidate.points_reward)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let Some(model) = model else {
            // Finalized or removed since it was read
            let still_there = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM coupon_usages WHERE id = $1)",
            )
            .bind(candidate.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

            return Err(if still_there {
                DomainError::AlreadyRedeemed
            } else {
                DomainError::InvalidCode
            });
        };

        if candidate.points_reward > 0 {
            credit_points(
                &mut tx,
                Snowflake::new(candidate.user_id),
                organization_id,
                candidate.points_reward,
            )
            .await?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(UsageRecord::from(model))
    }

    #[instrument(skip(self))]
    async fn delete_pending(&self, id: Snowflake, user_id: Snowflake) -> RepoResult<UsageRecord> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let record = sqlx::query_as::<_, UsageModel>(&format!(
            "SELECT {USAGE_COLUMNS} FROM coupon_usages WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .map(UsageRecord::from)
        .ok_or_else(|| usage_not_found(id))?;

        if record.user_id != user_id {
            return Err(DomainError::NotUsageOwner);
        }
        if record.is_used {
            return Err(DomainError::UsageAlreadyFinalized);
        }

        sqlx::query("DELETE FROM coupon_usages WHERE id = $1 AND NOT is_used")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        if record.points_spent > 0 {
            credit_points(&mut tx, record.user_id, record.organization_id, record.points_spent)
                .await?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(record)
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<UsageRecord>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let purged: Vec<UsageRecord> = sqlx::query_as::<_, UsageModel>(&format!(
            r"
            DELETE FROM coupon_usages
            WHERE NOT is_used AND redeemed_at < $1
            RETURNING {USAGE_COLUMNS}
            "
        ))
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?
        .into_iter()
        .map(UsageRecord::from)
        .collect();

        for record in purged.iter().filter(|r| r.points_spent > 0) {
            credit_points(&mut tx, record.user_id, record.organization_id, record.points_spent)
                .await?;
        }

        tx.commit().await.map_err(map_db_error)?;

        if !purged.is_empty() {
            info!(count = purged.len(), "Purged expired pending usages");
        }

        Ok(purged)
    }
}
