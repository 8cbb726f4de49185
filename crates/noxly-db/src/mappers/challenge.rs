//! Challenge entity <-> model mapper
//!
//! The condition is stored as `(condition_type, organization_ids)`; unknown
//! tags fail the conversion instead of being skipped.

use noxly_core::entities::{Challenge, ChallengeCondition, ChallengeProgress};
use noxly_core::error::DomainError;
use noxly_core::value_objects::Snowflake;

use crate::models::{ChallengeModel, ChallengeProgressModel};

impl TryFrom<ChallengeModel> for Challenge {
    type Error = DomainError;

    fn try_from(model: ChallengeModel) -> Result<Self, Self::Error> {
        let organizations = model
            .organization_ids
            .into_iter()
            .map(Snowflake::new)
            .collect();

        Ok(Challenge {
            id: Snowflake::new(model.id),
            title: model.title,
            description: model.description,
            condition: ChallengeCondition::from_parts(&model.condition_type, organizations)?,
            target_value: model.target_value,
            reward_points: model.reward_points,
            reward_organization_id: Snowflake::new(model.reward_organization_id),
            is_active: model.is_active,
            created_at: model.created_at,
        })
    }
}

/// Convert ChallengeProgressModel to ChallengeProgress entity
impl From<ChallengeProgressModel> for ChallengeProgress {
    fn from(model: ChallengeProgressModel) -> Self {
        ChallengeProgress {
            user_id: Snowflake::new(model.user_id),
            challenge_id: Snowflake::new(model.challenge_id),
            progress_value: model.progress_value,
            is_completed: model.is_completed,
            is_reward_claimed: model.is_reward_claimed,
            completed_at: model.completed_at,
            claimed_at: model.claimed_at,
            updated_at: model.updated_at,
        }
    }
}

/// Challenge values for insertion
pub struct ChallengeInsert<'a> {
    pub id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub condition_type: &'static str,
    pub organization_ids: Vec<i64>,
    pub target_value: i64,
    pub reward_points: i64,
    pub reward_organization_id: i64,
    pub is_active: bool,
}

impl<'a> ChallengeInsert<'a> {
    pub fn new(challenge: &'a Challenge) -> Self {
        Self {
            id: challenge.id.into_inner(),
            title: &challenge.title,
            description: challenge.description.as_deref(),
            condition_type: challenge.condition.tag(),
            organization_ids: super::organization_ids(challenge.condition.organizations()),
            target_value: challenge.target_value,
            reward_points: challenge.reward_points,
            reward_organization_id: challenge.reward_organization_id.into_inner(),
            is_active: challenge.is_active,
        }
    }
}
