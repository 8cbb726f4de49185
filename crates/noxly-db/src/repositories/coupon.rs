//! PostgreSQL implementation of CouponRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use noxly_core::entities::Coupon;
use noxly_core::traits::{CouponRepository, RepoResult};
use noxly_core::value_objects::Snowflake;

use crate::models::CouponModel;

use super::error::{coupon_not_found, map_db_error};

const COUPON_COLUMNS: &str = r"
    id, organization_id, title, description, is_code_required, max_uses_per_user,
    total_max_uses, points_cost, points_reward, expiry_date, is_active, is_archived,
    created_at, updated_at
";

/// PostgreSQL implementation of CouponRepository
#[derive(Clone)]
pub struct PgCouponRepository {
    pool: PgPool,
}

impl PgCouponRepository {
    /// Create a new PgCouponRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponRepository for PgCouponRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Coupon>> {
        let result = sqlx::query_as::<_, CouponModel>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Coupon::from))
    }

    #[instrument(skip(self))]
    async fn list_public(
        &self,
        organization_id: Option<Snowflake>,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Coupon>> {
        let results = sqlx::query_as::<_, CouponModel>(&format!(
            r"
            SELECT {COUPON_COLUMNS}
            FROM coupons
            WHERE is_active AND NOT is_archived
              AND (expiry_date IS NULL OR expiry_date >= $1)
              AND ($2::BIGINT IS NULL OR organization_id = $2)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(now)
        .bind(organization_id.map(Snowflake::into_inner))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Coupon::from).collect())
    }

    #[instrument(skip(self, coupon), fields(coupon_id = %coupon.id))]
    async fn create(&self, coupon: &Coupon) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO coupons (id, organization_id, title, description, is_code_required,
                max_uses_per_user, total_max_uses, points_cost, points_reward, expiry_date,
                is_active, is_archived, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(coupon.id.into_inner())
        .bind(coupon.organization_id.into_inner())
        .bind(&coupon.title)
        .bind(&coupon.description)
        .bind(coupon.is_code_required)
        .bind(coupon.max_uses_per_user)
        .bind(coupon.total_max_uses)
        .bind(coupon.points_cost)
        .bind(coupon.points_reward)
        .bind(coupon.expiry_date)
        .bind(coupon.is_active)
        .bind(coupon.is_archived)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, coupon), fields(coupon_id = %coupon.id))]
    async fn update(&self, coupon: &Coupon) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE coupons
            SET title = $2, description = $3, is_code_required = $4, max_uses_per_user = $5,
                total_max_uses = $6, points_cost = $7, points_reward = $8, expiry_date = $9,
                is_active = $10, updated_at = NOW()
            WHERE id = $1 AND NOT is_archived
            ",
        )
        .bind(coupon.id.into_inner())
        .bind(&coupon.title)
        .bind(&coupon.description)
        .bind(coupon.is_code_required)
        .bind(coupon.max_uses_per_user)
        .bind(coupon.total_max_uses)
        .bind(coupon.points_cost)
        .bind(coupon.points_reward)
        .bind(coupon.expiry_date)
        .bind(coupon.is_active)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(coupon_not_found(coupon.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn archive(&self, id: Snowflake) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE coupons
            SET is_archived = TRUE, is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(coupon_not_found(id));
        }

        Ok(())
    }
}
