use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::instrument;

use water_tracker_domain::auth::UserInfo;
use water_tracker_domain::entities::notification::{
    Notification, NotificationList, NotificationSettings, UpdateNotificationSettingsRequest,
};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;
use crate::entities::common::{CountResponse, NotificationQueryParams};

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(NotificationQueryParams),
    responses((status = 200, description = "Own notifications, newest first", body = NotificationList)),
    security(("bearer" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Query<NotificationQueryParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let page = params.pagination();
    let list = state
        .services
        .notifications
        .list_notifications(&user.user_id, params.status, page.offset(), page.limit())
        .await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread-count",
    responses((status = 200, description = "Unread notifications", body = CountResponse)),
    security(("bearer" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let count = state.services.notifications.unread_count(&user.user_id).await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    responses((status = 200, description = "Notifications marked read", body = CountResponse)),
    security(("bearer" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn mark_all_as_read(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let count = state.services.notifications.mark_all_as_read(&user.user_id).await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/{id}",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification found", body = Notification),
        (status = 403, description = "Not your notification", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_notification(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.notifications.get_notification(&user.actor(), &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 403, description = "Not your notification", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn mark_as_read(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.notifications.mark_as_read(&user.actor(), &id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notifications/{id}",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 403, description = "Not your notification", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    state.services.notifications.delete_notification(&user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/settings",
    responses((status = 200, description = "Delivery settings", body = NotificationSettings)),
    security(("bearer" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.notifications.get_settings(&user.user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/notifications/settings",
    request_body = UpdateNotificationSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = NotificationSettings),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<UpdateNotificationSettingsRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.notifications.update_settings(&user.user_id, request).await?))
}
