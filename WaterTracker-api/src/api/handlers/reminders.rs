use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::instrument;

use water_tracker_domain::auth::UserInfo;
use water_tracker_domain::entities::reminder::{CreateReminderRequest, Reminder, UpdateReminderRequest};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/reminders",
    request_body = CreateReminderRequest,
    responses(
        (status = 201, description = "Reminder created", body = Reminder),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn create_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<CreateReminderRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let reminder = state.services.reminders.create_reminder(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(reminder)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reminders",
    responses((status = 200, description = "Own reminders", body = [Reminder])),
    security(("bearer" = [])),
    tag = "reminders"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_reminders(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.reminders.list_reminders(&user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/reminders/{id}",
    params(("id" = String, Path, description = "Reminder ID")),
    responses(
        (status = 200, description = "Reminder found", body = Reminder),
        (status = 403, description = "Not your reminder", body = ErrorResponse),
        (status = 404, description = "Reminder not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.reminders.get_reminder(&user.actor(), &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/reminders/{id}",
    params(("id" = String, Path, description = "Reminder ID")),
    request_body = UpdateReminderRequest,
    responses(
        (status = 200, description = "Reminder updated", body = Reminder),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not your reminder", body = ErrorResponse),
        (status = 404, description = "Reminder not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn update_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
    Json(request): Json<UpdateReminderRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.reminders.update_reminder(&user.actor(), &id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reminders/{id}",
    params(("id" = String, Path, description = "Reminder ID")),
    responses(
        (status = 204, description = "Reminder deleted"),
        (status = 403, description = "Not your reminder", body = ErrorResponse),
        (status = 404, description = "Reminder not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_reminder(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    state.services.reminders.delete_reminder(&user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
