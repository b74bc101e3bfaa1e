//! Router-level tests: real routes and middleware over an in-memory database.

mod admin_test;
mod gdpr_test;
mod goals_test;
mod water_logs_test;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use water_tracker_domain::auth::{token, TokenType};
use water_tracker_domain::entities::user::{User, UserRole};
use water_tracker_domain::testing::{MockHealthService, TestContext};

use crate::api::{create_router, AppState};
use crate::ws::ConnectionManager;

const TEST_SECRET: &str = "test_secret_key_for_testing_only";

/// Auth-dependent assertions only hold when the bypass is off
pub(super) fn auth_enforced() -> bool {
    std::env::var("BYPASS_AUTH").is_err()
}

pub(super) struct TestApp {
    pub ctx: TestContext,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_health(MockHealthService::new())
    }

    pub fn with_health(health: MockHealthService) -> Self {
        std::env::set_var("JWT_SECRET", TEST_SECRET);
        let ctx = TestContext::new();
        let state = AppState::new(ctx.services.clone(), Arc::new(health), Arc::new(ConnectionManager::new()));
        Self { router: create_router(state), ctx }
    }

    /// A registered user and an access token for them
    pub async fn user(&self, username: &str) -> (User, String) {
        self.user_with_role(username, UserRole::User).await
    }

    /// An access token carrying the admin role
    pub async fn admin(&self, username: &str) -> (User, String) {
        self.user_with_role(username, UserRole::Admin).await
    }

    async fn user_with_role(&self, username: &str, role: UserRole) -> (User, String) {
        let user = self.ctx.create_user(username).await;
        let access = token::generate_token(&user.id, role, TokenType::Access).unwrap();
        (user, access)
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, bearer, None).await
    }

    pub async fn post(&self, uri: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, bearer, Some(body)).await
    }

    pub async fn put(&self, uri: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, bearer, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, bearer, None).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }
}
