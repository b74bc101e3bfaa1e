use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::logging::{log_access_denied, log_auth_event, AuthEvent, AuthEventType};
use crate::auth::UserInfo;

/// Let the request through only when the authenticated user holds one of `required_roles`.
///
/// Must run after `auth_middleware`, which puts the `UserInfo` in the request extensions.
pub async fn require_roles<I>(req: Request<Body>, next: Next, required_roles: I) -> Response
where
    I: IntoIterator<Item = String>,
{
    let required_roles: Vec<String> = required_roles.into_iter().collect();
    let request_path = req.uri().path().to_string();

    let Some(user) = req.extensions().get::<UserInfo>().cloned() else {
        warn!("No user info found in request extensions for path: {}", request_path);
        let event = AuthEvent::new(AuthEventType::AccessDenied, None, false)
            .with_details("Authentication context missing in request extensions")
            .with_resource(request_path)
            .with_auth_method("rbac");
        log_auth_event(event);

        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "unauthorized",
                "message": "Authentication required"
            })),
        )
            .into_response();
    };

    if required_roles.iter().any(|role| user.roles.contains(role)) {
        debug!("User {} has required role for {}", user.user_id, request_path);
        next.run(req).await
    } else {
        warn!("User {} lacks required roles {:?} for {}", user.user_id, required_roles, request_path);
        log_access_denied(&user.user_id, &request_path, &required_roles);

        (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "forbidden",
                "message": "You don't have the required permissions to access this resource",
                "details": { "required_roles": required_roles }
            })),
        )
            .into_response()
    }
}

/// Middleware requiring one role, for `axum::middleware::from_fn`
///
/// ```ignore
/// let admin_routes = Router::new()
///     .route("/stats", get(site_stats))
///     .layer(middleware::from_fn(require_role("admin")));
/// ```
pub fn require_role(role: &str) -> impl Fn(Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    require_any_role(&[role])
}

/// Middleware requiring any of several roles
pub fn require_any_role(roles: &[&str]) -> impl Fn(Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    move |req, next| {
        let roles = roles.clone();
        Box::pin(async move { require_roles(req, next, roles).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn user(roles: &[&str]) -> UserInfo {
        UserInfo {
            user_id: "test-user".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            auth_source: "test".to_string(),
        }
    }

    fn app(user_info: Option<UserInfo>) -> Router {
        let router = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn(require_role("admin")));
        match user_info {
            Some(info) => router.layer(Extension(info)),
            None => router,
        }
    }

    async fn status_for(user_info: Option<UserInfo>) -> StatusCode {
        let request = Request::builder().uri("/admin").body(Body::empty()).unwrap();
        app(user_info).oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_require_roles_with_matching_role() {
        assert_eq!(status_for(Some(user(&["user", "admin"]))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_require_roles_with_no_matching_role() {
        assert_eq!(status_for(Some(user(&["user"]))).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_require_roles_without_authentication() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }
}
