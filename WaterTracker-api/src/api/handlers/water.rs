use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use water_tracker_domain::entities::water::{
    CreateWaterProductRequest, ImportSummary, ProductPage, UpdateWaterProductRequest, WaterProductDetails,
    WaterSearchCriteria, WaterSummary,
};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;
use crate::entities::common::LimitParams;

const DEFAULT_TOP_RATED: usize = 10;

/// Search the product catalogue
#[utoipa::path(
    get,
    path = "/api/v1/water",
    params(WaterSearchCriteria),
    responses(
        (status = 200, description = "Matching products", body = ProductPage),
        (status = 400, description = "Invalid filters", body = ErrorResponse),
    ),
    tag = "water"
)]
#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    Query(criteria): Query<WaterSearchCriteria>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water.search_products(&criteria).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/water/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with derived health fields", body = WaterProductDetails),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    tag = "water"
)]
#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water.get_product(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/water/summary",
    responses((status = 200, description = "Catalogue aggregates", body = WaterSummary)),
    tag = "water"
)]
#[instrument(skip(state))]
pub async fn get_summary(State(state): State<AppState>) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water.get_summary().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/water/top-rated",
    params(LimitParams),
    responses((status = 200, description = "Highest scores first", body = [WaterProductDetails])),
    tag = "water"
)]
#[instrument(skip(state))]
pub async fn top_rated(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water.top_rated(params.limit_or(DEFAULT_TOP_RATED)).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/water/brands",
    responses((status = 200, description = "Distinct brand names", body = [String])),
    tag = "water"
)]
#[instrument(skip(state))]
pub async fn list_brands(State(state): State<AppState>) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water.list_brands().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/water/packaging-types",
    responses((status = 200, description = "Distinct packaging types", body = [String])),
    tag = "water"
)]
#[instrument(skip(state))]
pub async fn list_packaging_types(State(state): State<AppState>) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water.list_packaging_types().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/water",
    request_body = CreateWaterProductRequest,
    responses(
        (status = 201, description = "Product created", body = WaterProductDetails),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Product ID taken", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, request))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateWaterProductRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let product = state.services.water.create_product(request).await?;
    info!("Created product {}", product.product.id);
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/water/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = UpdateWaterProductRequest,
    responses(
        (status = 200, description = "Product updated", body = WaterProductDetails),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, request))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateWaterProductRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.services.water.update_product(id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/water/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ErrorResponse> {
    state.services.water.delete_product(id).await?;
    info!("Deleted product {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Import a product array or a scraped results page
#[utoipa::path(
    post,
    path = "/api/v1/admin/water/import",
    request_body(content = String, content_type = "application/json", description = "Product array or {\"results\": [...]} page"),
    responses(
        (status = 200, description = "Products upserted", body = ImportSummary),
        (status = 400, description = "Unreadable document", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn import_products(
    State(state): State<AppState>,
    body: String,
) -> Result<impl IntoResponse, ErrorResponse> {
    let summary = state.services.water.import_products(&body).await?;
    info!("Imported {} products, skipped {}", summary.imported, summary.skipped);
    Ok(Json(summary))
}
