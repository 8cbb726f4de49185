//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Redemption Responses
// ============================================================================

/// How a redemption completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionMode {
    /// Pending until staff finalize the shown code
    Code,
    /// Finalized on the spot
    Instant,
}

/// Result of starting a redemption
#[derive(Debug, Clone, Serialize)]
pub struct InitiatedRedemptionResponse {
    pub usage_id: String,
    pub coupon_id: String,
    /// Absent for instant coupons
    pub code: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub mode: RedemptionMode,
    pub points_spent: i64,
    pub points_awarded: i64,
    /// Balance with the coupon's organization after this redemption
    pub balance: i64,
}

/// Result of a staff finalization
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedRedemptionResponse {
    pub success: bool,
    pub usage_id: String,
    pub user_id: String,
    pub coupon_id: String,
    pub reward_points: i64,
    pub finalized_at: DateTime<Utc>,
}

/// A consumer's pending redemption, as shown with its countdown
#[derive(Debug, Clone, Serialize)]
pub struct PendingUsageResponse {
    pub usage_id: String,
    pub code: Option<String>,
    pub redeemed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub remaining_seconds: i64,
}

/// Usage state of one coupon for the current consumer
#[derive(Debug, Clone, Serialize)]
pub struct UsageStatusResponse {
    pub pending: bool,
    pub pending_usage: Option<PendingUsageResponse>,
    pub used_count: i64,
    pub max_uses_per_user: i32,
    /// `null` when unlimited
    pub remaining_uses: Option<i64>,
}

/// One entry of the usage change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageFeedEvent {
    pub usage_id: String,
    pub coupon_id: String,
    pub is_used: bool,
    pub deleted: bool,
}

// ============================================================================
// Coupon Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CouponResponse {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_code_required: bool,
    pub max_uses_per_user: i32,
    pub total_max_uses: Option<i32>,
    pub points_cost: i64,
    pub points_reward: i64,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Points & Challenge Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PointBalanceResponse {
    pub organization_id: String,
    pub points: i64,
    pub updated_at: DateTime<Utc>,
}

/// A challenge with the current consumer's progress on it
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeProgressResponse {
    pub challenge_id: String,
    pub title: String,
    pub description: Option<String>,
    pub condition_type: String,
    pub organization_ids: Vec<String>,
    pub target_value: i64,
    pub progress_value: i64,
    pub progress_percent: u8,
    pub is_completed: bool,
    pub is_reward_claimed: bool,
    pub reward_points: i64,
    pub reward_organization_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimRewardResponse {
    pub challenge_id: String,
    pub reward_points: i64,
    pub reward_organization_id: String,
    pub claimed_at: DateTime<Utc>,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// Health check status for each backing service
#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    /// `None` when the instance runs without a database pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// `None` when the instance runs without Redis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<String>,
}

fn health_label(healthy: bool) -> String {
    if healthy { "healthy" } else { "unhealthy" }.to_string()
}

impl ReadinessResponse {
    pub fn ready(database_healthy: Option<bool>, redis_healthy: Option<bool>) -> Self {
        let all_healthy = database_healthy.unwrap_or(true) && redis_healthy.unwrap_or(true);
        Self {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                database: database_healthy.map(health_label),
                redis: redis_healthy.map(health_label),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}
