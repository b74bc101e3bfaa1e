use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use water_tracker_domain::auth::logging::{log_auth_event, AuthEvent, AuthEventType};
use water_tracker_domain::auth::UserInfo;
use water_tracker_domain::services::ServiceError;

use crate::api::error::ErrorResponse;
use crate::api::state::AppState;

/// Reject requests whose account is banned or deleted. Must run after `auth_middleware`.
pub async fn require_active_account(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let Some(user) = req.extensions().get::<UserInfo>().cloned() else {
        return ErrorResponse::unauthorized("Authentication required").into_response();
    };
    if user.auth_source == "bypass" {
        return next.run(req).await;
    }

    match state.services.users.get_user(&user.user_id).await {
        Ok(account) if account.is_active => {
            debug!("Account {} is active", account.id);
            next.run(req).await
        },
        Ok(_) | Err(ServiceError::NotFound(_)) => {
            warn!("Rejected request from inactive account {}", user.user_id);
            let event = AuthEvent::new(AuthEventType::AccessDenied, Some(&user.user_id), false)
                .with_resource(req.uri().path())
                .with_details("account is not active")
                .with_auth_method("jwt");
            log_auth_event(event);
            ErrorResponse::unauthorized("Account is not active").into_response()
        },
        Err(e) => ErrorResponse::from(e).into_response(),
    }
}
