use std::sync::{Arc, Once};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use water_tracker_api::{create_router, AppState};
use water_tracker_api::tasks::run_maintenance;
use water_tracker_api::ws::ConnectionManager;
use water_tracker_domain::clock::Clock;
use water_tracker_domain::testing::{MockHealthService, TestContext};

// Ensure tracing is initialized only once
static INIT: Once = Once::new();

fn initialize() {
    INIT.call_once(|| {
        std::env::set_var("JWT_SECRET", "integration_test_secret");
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn auth_enforced() -> bool {
    std::env::var("BYPASS_AUTH").is_err()
}

fn test_app() -> (Router, TestContext) {
    initialize();
    let ctx = TestContext::new();
    let state = AppState::new(
        ctx.services.clone(),
        Arc::new(MockHealthService::new()),
        Arc::new(ConnectionManager::new()),
    );
    (create_router(state), ctx)
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

/// Register through the API and return (user id, access token)
async fn register(app: &Router, username: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/users",
        None,
        Some(json!({"username": username, "email": format!("{}@example.com", username)})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["tokens"]["access_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (app, _ctx) = test_app();

    let (status, doc) = call(&app, Method::GET, "/api-docs/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], "WaterTracker API");
    assert!(doc["paths"]["/api/v1/logs"].is_object());
}

#[tokio::test]
async fn test_security_headers_are_applied() {
    let (app, _ctx) = test_app();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), mime::APPLICATION_JSON.as_ref());
}

#[tokio::test]
async fn test_catalogue_is_public() {
    let (app, _ctx) = test_app();

    let (status, page) = call(&app, Method::GET, "/api/v1/water?page=1&size=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 0);
    assert_eq!(page["page"], 1);

    let (status, _) = call(&app, Method::GET, "/api/v1/water/424242", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_first_log_unlocks_an_achievement() {
    if !auth_enforced() {
        return;
    }
    let (app, _ctx) = test_app();
    let (_, token) = register(&app, "first_timer").await;

    let (status, _) = call(&app, Method::POST, "/api/v1/logs", Some(&token), Some(json!({"volume_ml": 250}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, held) = call(&app, Method::GET, "/api/v1/achievements/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(held[0]["achievement_id"], "first_sip");
    assert_eq!(held[0]["stage"], 1);

    let (status, catalog) = call(&app, Method::GET, "/api/v1/achievements", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(catalog.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_friendship_flow() {
    if !auth_enforced() {
        return;
    }
    let (app, _ctx) = test_app();
    let (ana_id, ana_token) = register(&app, "ana_sips").await;
    let (ben_id, ben_token) = register(&app, "ben_sips").await;

    let (status, request) = call(
        &app,
        Method::POST,
        "/api/v1/social/friends/requests",
        Some(&ana_token),
        Some(json!({"addressee_id": ben_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");

    let (status, pending) = call(&app, Method::GET, "/api/v1/social/friends/requests", Some(&ben_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let request_id = request["id"].as_str().unwrap();
    let (status, accepted) = call(
        &app,
        Method::POST,
        &format!("/api/v1/social/friends/requests/{}/respond", request_id),
        Some(&ben_token),
        Some(json!({"action": "accept"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let (status, friends) = call(&app, Method::GET, "/api/v1/social/friends", Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(friends[0]["user_id"], ben_id.as_str());
    assert_eq!(friends[0]["username"], "ben_sips");

    let (_, friends) = call(&app, Method::GET, "/api/v1/social/friends", Some(&ben_token), None).await;
    assert_eq!(friends[0]["user_id"], ana_id.as_str());
}

#[tokio::test]
async fn test_reminder_is_delivered_by_maintenance() {
    if !auth_enforced() {
        return;
    }
    let (app, ctx) = test_app();
    let (_, token) = register(&app, "reminded").await;

    let (status, reminder) = call(
        &app,
        Method::POST,
        "/api/v1/reminders",
        Some(&token),
        Some(json!({"time_of_day": "12:00"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reminder["message"], "Time to drink some water!");

    let report = run_maintenance(&ctx.services, ctx.clock.now()).await;
    assert_eq!(report.reminders_sent, 1);

    let (_, list) = call(&app, Method::GET, "/api/v1/notifications", Some(&token), None).await;
    assert_eq!(list["total"], 1);
}
