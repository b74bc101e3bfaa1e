use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument};

use water_tracker_domain::auth::UserInfo;
use water_tracker_domain::entities::goal::{
    CreateGoalRequest, GoalProgressView, GoalStats, GoalSummary, HealthGoal, LogProgressRequest, ProgressOutcome,
    UpdateGoalRequest,
};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;
use crate::entities::common::GoalQueryParams;

#[utoipa::path(
    post,
    path = "/api/v1/goals",
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created", body = HealthGoal),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn create_goal(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<CreateGoalRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let goal = state.services.goals.create_goal(&user.user_id, request).await?;
    info!("Created goal {}", goal.id);
    Ok((StatusCode::CREATED, Json(goal)))
}

#[utoipa::path(
    get,
    path = "/api/v1/goals",
    params(GoalQueryParams),
    responses((status = 200, description = "Own goals", body = [HealthGoal])),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_goals(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Query<GoalQueryParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.goals.list_goals(&user.user_id, params.status).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/goals/stats",
    responses((status = 200, description = "Totals across own goals", body = GoalStats)),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn goal_stats(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.goals.goal_stats(&user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/goals/{id}",
    params(("id" = String, Path, description = "Goal ID")),
    responses(
        (status = 200, description = "Goal found", body = HealthGoal),
        (status = 403, description = "Not your goal", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_goal(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.goals.get_goal(&user.actor(), &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/goals/{id}",
    params(("id" = String, Path, description = "Goal ID")),
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Goal updated", body = HealthGoal),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not your goal", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn update_goal(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
    Json(request): Json<UpdateGoalRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.goals.update_goal(&user.actor(), &id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/goals/{id}",
    params(("id" = String, Path, description = "Goal ID")),
    responses(
        (status = 204, description = "Goal deleted"),
        (status = 403, description = "Not your goal", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_goal(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    state.services.goals.delete_goal(&user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record progress towards a goal
///
/// Newly reached milestones come back in `new_achievements`.
#[utoipa::path(
    post,
    path = "/api/v1/goals/{id}/progress",
    params(("id" = String, Path, description = "Goal ID")),
    request_body = LogProgressRequest,
    responses(
        (status = 201, description = "Progress recorded", body = ProgressOutcome),
        (status = 400, description = "Invalid value or inactive goal", body = ErrorResponse),
        (status = 403, description = "Not your goal", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn log_progress(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
    Json(request): Json<LogProgressRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let outcome = state.services.goals.log_progress(&user.actor(), &id, request).await?;
    if !outcome.new_achievements.is_empty() {
        info!("Goal {} reached {} milestone(s)", id, outcome.new_achievements.len());
    }
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[utoipa::path(
    get,
    path = "/api/v1/goals/{id}/progress",
    params(("id" = String, Path, description = "Goal ID")),
    responses(
        (status = 200, description = "Entries, completion and streaks", body = GoalProgressView),
        (status = 403, description = "Not your goal", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn progress_view(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.goals.progress_view(&user.actor(), &id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/goals/{id}/summary",
    params(("id" = String, Path, description = "Goal ID")),
    responses(
        (status = 200, description = "Completion, days left and milestones", body = GoalSummary),
        (status = 403, description = "Not your goal", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "goals"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn goal_summary(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.goals.goal_summary(&user.actor(), &id).await?))
}
