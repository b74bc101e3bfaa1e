use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument};

use water_tracker_domain::auth::{token, UserInfo};
use water_tracker_domain::entities::user::{UpdateUserRequest, User, UserProfile};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Profile with level progress and totals", body = UserProfile),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let profile = state.services.users.get_profile(&user.user_id).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 403, description = "Not your account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    user.actor().ensure_can_access(&id)?;
    Ok(Json(state.services.users.get_user(&id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/profile",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile found", body = UserProfile),
        (status = 403, description = "Not your account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    user.actor().ensure_can_access(&id)?;
    Ok(Json(state.services.users.get_profile(&id).await?))
}

/// Update email, daily goal or active flag
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not your account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email taken", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let deactivating = request.is_active == Some(false);
    let updated = state.services.users.update_user(&user.actor(), &id, request).await?;
    if deactivating {
        token::revoke_user(&id);
    }
    Ok(Json(updated))
}

/// Soft-delete an account and revoke its tokens
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "Account deactivated"),
        (status = 403, description = "Not your account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    state.services.users.deactivate_user(&user.actor(), &id).await?;
    token::revoke_user(&id);
    info!("Deactivated user {}", id);
    Ok(StatusCode::NO_CONTENT)
}
