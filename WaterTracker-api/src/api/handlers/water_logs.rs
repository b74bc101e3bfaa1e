use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use tracing::{info, instrument};

use water_tracker_domain::auth::UserInfo;
use water_tracker_domain::entities::water_log::{
    CreateWaterLogRequest, DailySummary, HydrationAnalytics, LogPage, UpdateWaterLogRequest, WaterLog,
};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;
use crate::entities::common::{DateParams, LogQueryParams};

/// Record water intake
///
/// Grants XP and points, advances the streak and re-checks achievements.
#[utoipa::path(
    post,
    path = "/api/v1/logs",
    request_body = CreateWaterLogRequest,
    responses(
        (status = 201, description = "Intake recorded", body = WaterLog),
        (status = 400, description = "Invalid request or unknown product", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "water_logs"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn log_water(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<CreateWaterLogRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let log = state.services.water_logs.log_water(&user.user_id, request).await?;
    info!("Logged {} ml for {}", log.volume_ml, user.user_id);
    Ok((StatusCode::CREATED, Json(log)))
}

#[utoipa::path(
    get,
    path = "/api/v1/logs",
    params(LogQueryParams),
    responses((status = 200, description = "Own logs, newest first", body = LogPage)),
    security(("bearer" = [])),
    tag = "water_logs"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn search_logs(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Query<LogQueryParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let criteria = params.into_criteria();
    Ok(Json(state.services.water_logs.search_logs(&user.user_id, &criteria).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/logs/{id}",
    params(("id" = String, Path, description = "Log ID")),
    responses(
        (status = 200, description = "Log found", body = WaterLog),
        (status = 403, description = "Not your log", body = ErrorResponse),
        (status = 404, description = "Log not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "water_logs"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_log(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water_logs.get_log(&user.actor(), &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/logs/{id}",
    params(("id" = String, Path, description = "Log ID")),
    request_body = UpdateWaterLogRequest,
    responses(
        (status = 200, description = "Log updated", body = WaterLog),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not your log", body = ErrorResponse),
        (status = 404, description = "Log not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "water_logs"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn update_log(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
    Json(request): Json<UpdateWaterLogRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water_logs.update_log(&user.actor(), &id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/logs/{id}",
    params(("id" = String, Path, description = "Log ID")),
    responses(
        (status = 204, description = "Log deleted"),
        (status = 403, description = "Not your log", body = ErrorResponse),
        (status = 404, description = "Log not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "water_logs"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_log(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    state.services.water_logs.delete_log(&user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/logs/summary",
    params(DateParams),
    responses((status = 200, description = "Totals for one day", body = DailySummary)),
    security(("bearer" = [])),
    tag = "water_logs"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn daily_summary(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Query<DateParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.services.water_logs.daily_summary(&user.user_id, date).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/logs/analytics",
    responses((status = 200, description = "Last thirty days", body = HydrationAnalytics)),
    security(("bearer" = [])),
    tag = "water_logs"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn analytics(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water_logs.analytics(&user.user_id).await?))
}
