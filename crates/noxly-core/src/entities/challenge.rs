//! Challenges - cross-organization achievements and per-user progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// What a challenge measures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeCondition {
    /// Finalized redemptions, limited to `organizations` when non-empty
    RedeemCount { organizations: Vec<Snowflake> },
    /// Distinct organizations with at least one finalized redemption
    DifferentOrganizations,
    /// Sum of point balances, limited to `organizations` when non-empty
    TotalPoints { organizations: Vec<Snowflake> },
}

impl ChallengeCondition {
    pub const REDEEM_COUNT: &'static str = "REDEEM_COUNT";
    pub const DIFFERENT_ORGANIZATIONS: &'static str = "DIFFERENT_ORGANIZATIONS";
    pub const TOTAL_POINTS: &'static str = "TOTAL_POINTS";

    /// Storage tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RedeemCount { .. } => Self::REDEEM_COUNT,
            Self::DifferentOrganizations => Self::DIFFERENT_ORGANIZATIONS,
            Self::TotalPoints { .. } => Self::TOTAL_POINTS,
        }
    }

    /// Organization filter as stored; empty for conditions without one
    pub fn organizations(&self) -> &[Snowflake] {
        match self {
            Self::RedeemCount { organizations } | Self::TotalPoints { organizations } => {
                organizations
            }
            Self::DifferentOrganizations => &[],
        }
    }

    /// Rebuild from the stored `(tag, organization_ids)` pair
    pub fn from_parts(tag: &str, organizations: Vec<Snowflake>) -> Result<Self, DomainError> {
        match tag {
            Self::REDEEM_COUNT => Ok(Self::RedeemCount { organizations }),
            Self::DIFFERENT_ORGANIZATIONS => Ok(Self::DifferentOrganizations),
            Self::TOTAL_POINTS => Ok(Self::TotalPoints { organizations }),
            other => Err(DomainError::ValidationError(format!(
                "unknown challenge condition: {other}"
            ))),
        }
    }
}

/// Challenge entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub id: Snowflake,
    pub title: String,
    pub description: Option<String>,
    pub condition: ChallengeCondition,
    pub target_value: i64,
    pub reward_points: i64,
    /// Balance that receives the reward
    pub reward_organization_id: Snowflake,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.target_value < 1 {
            return Err(DomainError::ValidationError(
                "target_value must be at least 1".to_string(),
            ));
        }
        if self.reward_points < 0 {
            return Err(DomainError::ValidationError(
                "reward_points must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// `min(100, floor(progress / target * 100))`
    pub fn progress_percent(&self, progress: i64) -> u8 {
        if self.target_value <= 0 {
            return 100;
        }
        let percent = progress.max(0).saturating_mul(100) / self.target_value;
        percent.min(100) as u8
    }
}

/// Progress of one user on one challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeProgress {
    pub user_id: Snowflake,
    pub challenge_id: Snowflake,
    pub progress_value: i64,
    pub is_completed: bool,
    pub is_reward_claimed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ChallengeProgress {
    pub fn new(user_id: Snowflake, challenge_id: Snowflake, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            challenge_id,
            progress_value: 0,
            is_completed: false,
            is_reward_claimed: false,
            completed_at: None,
            claimed_at: None,
            updated_at: now,
        }
    }

    /// Store a new measurement; completion never reverts
    pub fn record(&mut self, value: i64, target: i64, now: DateTime<Utc>) {
        self.progress_value = value;
        self.updated_at = now;
        if !self.is_completed && value >= target {
            self.is_completed = true;
            self.completed_at = Some(now);
        }
    }

    #[inline]
    pub fn is_claimable(&self) -> bool {
        self.is_completed && !self.is_reward_claimed
    }
}
