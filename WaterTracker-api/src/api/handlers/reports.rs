use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument};

use water_tracker_domain::auth::UserInfo;
use water_tracker_domain::entities::report::{GenerateReportRequest, Report};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;

/// Build and store a report for a date range
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    request_body = GenerateReportRequest,
    responses(
        (status = 201, description = "Report generated", body = Report),
        (status = 400, description = "Invalid period", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn generate_report(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Json(request): Json<GenerateReportRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let report = state.services.reports.generate_report(&user.user_id, request).await?;
    info!("Generated {} report {}", report.report_type, report.id);
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports",
    responses((status = 200, description = "Own reports", body = [Report])),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.reports.list_reports(&user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    params(("id" = String, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report found", body = Report),
        (status = 403, description = "Not your report", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_report(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.reports.get_report(&user.actor(), &id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reports/{id}",
    params(("id" = String, Path, description = "Report ID")),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 403, description = "Not your report", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_report(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    state.services.reports.delete_report(&user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
