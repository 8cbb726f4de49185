//! Challenge database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for challenges table
#[derive(Debug, Clone, FromRow)]
pub struct ChallengeModel {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub condition_type: String,
    pub organization_ids: Vec<i64>,
    pub target_value: i64,
    pub reward_points: i64,
    pub reward_organization_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Database model for challenge_progress table
#[derive(Debug, Clone, FromRow)]
pub struct ChallengeProgressModel {
    pub user_id: i64,
    pub challenge_id: i64,
    pub progress_value: i64,
    pub is_completed: bool,
    pub is_reward_claimed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
