//! Staff scope extractor
//!
//! Resolves the organization a staff request acts for from the
//! `X-Organization-Id` header and loads the caller's permissions there.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use noxly_core::entities::StaffScope;
use noxly_core::Snowflake;
use noxly_service::StaffService;

use super::auth::AuthUser;
use crate::response::{ApiError, ORGANIZATION_HEADER};
use crate::state::AppState;

/// Authenticated staff member acting within one organization
#[derive(Debug, Clone, Copy)]
pub struct StaffContext(pub StaffScope);

#[async_trait]
impl<S> FromRequestParts<S> for StaffContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let organization_id: Snowflake = parts
            .headers
            .get(ORGANIZATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .filter(|id: &Snowflake| !id.is_zero())
            .ok_or(ApiError::MissingOrganization)?;

        let app_state = AppState::from_ref(state);
        let scope = StaffService::new(app_state.service_context())
            .resolve_scope(organization_id, auth.user_id)
            .await?;

        Ok(Self(scope))
    }
}
