use axum::http::StatusCode;
use serde_json::json;

use super::{auth_enforced, TestApp};

#[tokio::test]
async fn test_logged_water_shows_in_daily_summary() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (ana, token) = app.user("ana").await;

    let (status, log) = app.post("/api/v1/logs", Some(&token), json!({"volume_ml": 500})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(log["user_id"], ana.id.as_str());
    assert_eq!(log["volume_ml"], 500);

    app.post("/api/v1/logs", Some(&token), json!({"volume_ml": 1500, "drink_type": "sparkling"}))
        .await;

    let (status, summary) = app.get("/api/v1/logs/summary?date=2024-06-15", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_volume_ml"], 2000);
    assert_eq!(summary["log_count"], 2);
    assert_eq!(summary["goal_met"], true);

    let (status, page) = app.get("/api/v1/logs?limit=1", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["logs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_log_volume_is_validated() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (_, token) = app.user("ana").await;

    let (status, body) = app.post("/api/v1/logs", Some(&token), json!({"volume_ml": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = app.post("/api/v1/logs", Some(&token), json!({"volume_ml": 250, "water_id": 999})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logs_are_private_to_their_owner() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (_, ana_token) = app.user("ana").await;
    let (_, ben_token) = app.user("ben").await;

    let (_, log) = app.post("/api/v1/logs", Some(&ana_token), json!({"volume_ml": 300})).await;
    let uri = format!("/api/v1/logs/{}", log["id"].as_str().unwrap());

    let (status, _) = app.get(&uri, Some(&ben_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&ben_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&ana_token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, Some(&ana_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
