use axum::{extract::State, response::IntoResponse, Extension, Json};
use tracing::{info, instrument};

use water_tracker_domain::auth::UserInfo;
use water_tracker_domain::entities::achievement::{AchievementDefinition, UserAchievement};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/achievements",
    responses((status = 200, description = "Achievement definitions", body = [AchievementDefinition])),
    security(("bearer" = [])),
    tag = "achievements"
)]
#[instrument(skip(state))]
pub async fn list_catalog(State(state): State<AppState>) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.achievements.list_catalog().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/achievements/me",
    responses((status = 200, description = "Stages earned by the caller", body = [UserAchievement])),
    security(("bearer" = [])),
    tag = "achievements"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_user_achievements(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.achievements.list_user_achievements(&user.user_id).await?))
}

/// Re-evaluate every achievement for the caller
#[utoipa::path(
    post,
    path = "/api/v1/achievements/check",
    responses((status = 200, description = "Stages advanced by this check", body = [UserAchievement])),
    security(("bearer" = [])),
    tag = "achievements"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn check_achievements(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let advanced = state.services.achievements.check_and_grant(&user.user_id).await?;
    if !advanced.is_empty() {
        info!("Advanced {} achievement(s)", advanced.len());
    }
    Ok(Json(advanced))
}
