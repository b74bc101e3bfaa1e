use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use tracing::{error, info, instrument, warn};

use water_tracker_domain::auth::logging::{log_logout, log_token_refresh, log_tokens_issued};
use water_tracker_domain::auth::{token, Claims, SecurityError, TokenPair, TokenType, UserInfo};
use water_tracker_domain::entities::user::{CreateUserRequest, UserRole};

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;
use crate::entities::auth::{AuthInfoResponse, RefreshRequest, RegistrationResponse};
use crate::entities::common::MessageResponse;

fn issue_tokens(user_id: &str, role: UserRole) -> Result<TokenPair, ErrorResponse> {
    token::generate_token_pair(user_id, role).map_err(|e| {
        error!("Failed to issue tokens for {}: {}", user_id, e);
        ErrorResponse::internal_error()
    })
}

/// Register an account and receive its first token pair
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = RegistrationResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let user = state.services.users.create_user(request).await?;
    let tokens = issue_tokens(&user.id, user.role)?;
    log_tokens_issued(&user.id);
    info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(RegistrationResponse { user, tokens })))
}

/// Trade a refresh token for a new token pair
///
/// The presented refresh token is revoked, and the new access token carries
/// the role currently stored for the user.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token rejected", body = ErrorResponse),
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let claims = match token::validate_token_of_type(&request.refresh_token, TokenType::Refresh) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Refresh rejected: {}", e);
            log_token_refresh("unknown", false, Some(&e.to_string()));
            return Err(match e {
                SecurityError::ConfigError(_) => ErrorResponse::internal_error(),
                other => ErrorResponse::unauthorized(other.to_string()),
            });
        }
    };

    let user = match state.services.users.get_user(&claims.sub).await {
        Ok(user) if user.is_active => user,
        _ => {
            log_token_refresh(&claims.sub, false, Some("account unavailable"));
            return Err(ErrorResponse::unauthorized("Account is not active"));
        }
    };

    token::revoke_token(&claims);
    let tokens = issue_tokens(&user.id, user.role)?;
    log_token_refresh(&user.id, true, None);
    Ok(Json(tokens))
}

/// Revoke the access token used for this request
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn logout(
    Extension(user): Extension<UserInfo>,
    claims: Option<Extension<Claims>>,
) -> impl IntoResponse {
    if let Some(Extension(claims)) = claims {
        token::revoke_token(&claims);
    }
    log_logout(&user.user_id);
    Json(MessageResponse::new("Logged out"))
}

/// Describe the authenticated caller
#[utoipa::path(
    get,
    path = "/auth/info",
    responses(
        (status = 200, description = "Caller information", body = AuthInfoResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn auth_info(
    Extension(user): Extension<UserInfo>,
    claims: Option<Extension<Claims>>,
) -> impl IntoResponse {
    Json(AuthInfoResponse {
        user_id: user.user_id,
        roles: user.roles,
        auth_source: user.auth_source,
        expires_at: claims.map(|Extension(claims)| claims.exp),
    })
}
