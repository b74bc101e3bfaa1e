//! Authentication for the WaterTracker API
//!
//! Plain HS256 JWTs: access tokens guard the REST routes and the WebSocket,
//! refresh tokens only buy new access tokens.

use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

#[cfg(feature = "with-axum")]
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "with-axum")]
use tracing::{debug, warn};

use crate::entities::user::UserRole;
use crate::services::errors::Actor;

pub mod token;
pub mod token_blacklist;
pub mod logging;

#[cfg(feature = "with-axum")]
pub mod authorize;

#[cfg(feature = "with-axum")]
use crate::auth::logging::{log_auth_event, AuthEvent, AuthEventType};
pub use token::{SecurityError, TokenType};

/// Authentication claims for JSON Web Tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Token ID, the key used for single-token revocation
    pub jti: String,
    pub role: UserRole,
    #[cfg_attr(feature = "with-api", schema(value_type = String))]
    pub token_type: TokenType,
}

/// User information extracted from authenticated requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UserInfo {
    pub user_id: String,
    pub roles: Vec<String>,
    /// "jwt" or "bypass"
    pub auth_source: String,
}

impl UserInfo {
    pub fn from_claims(claims: &Claims) -> Self {
        let mut roles = vec![UserRole::User.as_str().to_string()];
        if claims.role == UserRole::Admin {
            roles.push(UserRole::Admin.as_str().to_string());
        }
        Self {
            user_id: claims.sub.clone(),
            roles,
            auth_source: "jwt".to_string(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == UserRole::Admin.as_str())
    }

    /// The caller as seen by the services
    pub fn actor(&self) -> Actor {
        if self.is_admin() {
            Actor::admin(&self.user_id)
        } else {
            Actor::user(&self.user_id)
        }
    }
}

/// Tokens handed to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Pull the token out of an `Authorization: Bearer ...` header
#[cfg(feature = "with-axum")]
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or("Authorization header does not contain Bearer token")
}

#[cfg(feature = "with-axum")]
fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

/// Authentication middleware for protected routes
#[cfg(feature = "with-axum")]
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Response {
    if cfg!(debug_assertions) && std::env::var("BYPASS_AUTH").is_ok() {
        debug!("Auth bypass enabled in development mode");
        let user_id = std::env::var("BYPASS_AUTH_USER").unwrap_or_else(|_| "dev-user".to_string());
        req.extensions_mut().insert(UserInfo {
            user_id,
            roles: vec![UserRole::User.as_str().to_string(), UserRole::Admin.as_str().to_string()],
            auth_source: "bypass".to_string(),
        });
        return next.run(req).await;
    }

    let request_path = req.uri().path().to_string();
    let start_time = std::time::Instant::now();

    let token = match bearer_token(req.headers()) {
        Ok(token) => token.to_string(),
        Err(reason) => {
            debug!("{} for {}", reason, request_path);
            let event = AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details(reason)
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);
            return unauthorized(reason);
        }
    };

    match token::validate_token_of_type(&token, TokenType::Access) {
        Ok(claims) => {
            debug!("Token validated for user: {}", claims.sub);
            let event = AuthEvent::new(AuthEventType::TokenValidation, Some(&claims.sub), true)
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);

            req.extensions_mut().insert(UserInfo::from_claims(&claims));
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            warn!("Rejected token for {}: {}", request_path, e);
            let event = AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details(e.to_string())
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt");
            log_auth_event(event);

            let message = match e {
                SecurityError::TokenExpired => "Token has expired",
                SecurityError::TokenRevoked => "Token has been revoked",
                SecurityError::ConfigError(_) => "Authentication is not configured",
                _ => "Invalid token",
            };
            unauthorized(message)
        }
    }
}

/// Wrap the application in CORS and security headers
#[cfg(feature = "with-web")]
pub fn configure_auth(app: axum::Router) -> axum::Router {
    use axum::http::{HeaderName, HeaderValue, Method};
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::set_header::SetResponseHeaderLayer;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=(), interest-cohort=()"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ));

    app.layer(cors).layer(security_headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    async fn whoami(Extension(user): Extension<UserInfo>) -> String {
        format!("{}:{}", user.user_id, user.is_admin())
    }

    fn app() -> Router {
        Router::new()
            .route("/me", get(whoami))
            .layer(middleware::from_fn(auth_middleware))
    }

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/me");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err("Missing Authorization header"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Err("Authorization header does not contain Bearer token"));

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Ok("abc.def"));
    }

    #[test]
    fn test_user_info_from_claims() {
        let claims = Claims {
            sub: "u1".to_string(),
            iss: token::DEFAULT_ISSUER.to_string(),
            iat: 0,
            exp: 1,
            jti: "j".to_string(),
            role: UserRole::Admin,
            token_type: TokenType::Access,
        };
        let info = UserInfo::from_claims(&claims);
        assert_eq!(info.roles, vec!["user".to_string(), "admin".to_string()]);
        assert_eq!(info.actor(), Actor::admin("u1"));
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        if std::env::var("BYPASS_AUTH").is_ok() {
            return;
        }
        let response = app().oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_access_token_passes() {
        if std::env::var("BYPASS_AUTH").is_ok() {
            return;
        }
        token::tests::setup_test_env();
        let access = token::generate_token("mw-user", UserRole::User, TokenType::Access).unwrap();

        let response = app().oneshot(request(Some(&format!("Bearer {}", access)))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "mw-user:false");
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        if std::env::var("BYPASS_AUTH").is_ok() {
            return;
        }
        token::tests::setup_test_env();
        let refresh = token::generate_token("mw-user", UserRole::User, TokenType::Refresh).unwrap();

        let response = app().oneshot(request(Some(&format!("Bearer {}", refresh)))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
