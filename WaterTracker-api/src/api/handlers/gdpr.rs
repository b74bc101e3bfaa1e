use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument};

use water_tracker_domain::auth::{logging::log_token_revocation, token, UserInfo};
use water_tracker_domain::entities::gdpr::{
    CreateGdprRequest, GdprRequest, GdprRequestStatus, GdprRequestType, UpdateGdprStatusRequest,
};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;
use crate::entities::common::GdprQueryParams;

/// File a data-subject request
///
/// Access and portability requests return with their export attached;
/// a completed erasure also revokes every token of the account.
#[utoipa::path(
    post,
    path = "/api/v1/gdpr",
    request_body = CreateGdprRequest,
    responses(
        (status = 201, description = "Request filed", body = GdprRequest),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Same request already open", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "gdpr"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<CreateGdprRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let filed = state.services.gdpr.create_request(&user.user_id, request).await?;
    if filed.request_type == GdprRequestType::Erasure && filed.status == GdprRequestStatus::Completed {
        token::revoke_user(&user.user_id);
        log_token_revocation(&user.user_id, Some("erasure"));
    }
    info!("Filed {} request {}", filed.request_type, filed.id);
    Ok((StatusCode::CREATED, Json(filed)))
}

#[utoipa::path(
    get,
    path = "/api/v1/gdpr",
    responses((status = 200, description = "Own requests", body = [GdprRequest])),
    security(("bearer" = [])),
    tag = "gdpr"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.gdpr.list_requests(&user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/gdpr/{id}",
    params(("id" = String, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request found", body = GdprRequest),
        (status = 403, description = "Not your request", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "gdpr"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_request(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.gdpr.get_request(&user.actor(), &id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/gdpr",
    params(GdprQueryParams),
    responses(
        (status = 200, description = "Every request", body = [GdprRequest]),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_all_requests(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Query<GdprQueryParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.gdpr.list_all_requests(&user.actor(), params.status).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/gdpr/{id}",
    params(("id" = String, Path, description = "Request ID")),
    request_body = UpdateGdprStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = GdprRequest),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn update_request_status(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
    Json(request): Json<UpdateGdprStatusRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.gdpr.update_status(&user.actor(), &id, request).await?))
}
