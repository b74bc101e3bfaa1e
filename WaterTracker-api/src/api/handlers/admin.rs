use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument};

use water_tracker_domain::auth::{logging::log_token_revocation, token, UserInfo};
use water_tracker_domain::entities::admin::{AnnouncementRequest, SiteStats};
use water_tracker_domain::entities::user::{SetRoleRequest, User};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;
use crate::entities::common::{CountResponse, PaginationParams, UserListResponse};

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses(
        (status = 200, description = "Site-wide counters", body = SiteStats),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn site_stats(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.admin.site_stats(&user.actor()).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(PaginationParams),
    responses(
        (status = 200, description = "One page of users", body = UserListResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let (offset, limit) = (params.offset(), params.limit());
    let (users, total) = state.services.users.list_users(&user.actor(), offset, limit).await?;
    Ok(Json(UserListResponse { users, total, offset, limit }))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users/by-username/{username}",
    params(("username" = String, Path, description = "Username, case-insensitive")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state))]
pub async fn find_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.users.get_user_by_username(&username).await?))
}

/// Change a user's role; it reaches their tokens at the next refresh
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/role",
    params(("id" = String, Path, description = "User ID")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = User),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn set_role(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
    Json(request): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let updated = state.services.users.set_role(&user.actor(), &id, request.role).await?;
    info!("User {} is now {}", id, updated.role);
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/ban",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User banned", body = User),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn ban_user(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let banned = state.services.users.set_active(&user.actor(), &id, false).await?;
    token::revoke_user(&id);
    log_token_revocation(&id, Some("banned"));
    Ok(Json(banned))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/unban",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User reinstated", body = User),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn unban_user(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let reinstated = state.services.users.set_active(&user.actor(), &id, true).await?;
    token::restore_user(&id);
    info!("User {} reinstated", id);
    Ok(Json(reinstated))
}

/// Send a system announcement to a list of users
#[utoipa::path(
    post,
    path = "/api/v1/admin/announcements",
    request_body = AnnouncementRequest,
    responses(
        (status = 200, description = "Users notified", body = CountResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn send_announcement(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<AnnouncementRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let count = state.services.admin.send_announcement(&user.actor(), request).await?;
    Ok(Json(CountResponse { count }))
}
