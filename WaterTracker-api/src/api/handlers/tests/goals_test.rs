use axum::http::StatusCode;
use serde_json::json;

use super::{auth_enforced, TestApp};

fn hydration_goal() -> serde_json::Value {
    json!({
        "name": "Drink more",
        "goal_type": "daily_hydration",
        "target_value": 2000.0,
        "unit": "ml",
        "frequency": "daily",
        "target_date": "2024-07-15"
    })
}

#[tokio::test]
async fn test_create_goal_and_log_progress() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (_, token) = app.user("ana").await;

    let (status, goal) = app.post("/api/v1/goals", Some(&token), hydration_goal()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(goal["status"], "active");
    assert_eq!(goal["current_value"], 0.0);

    let goal_id = goal["id"].as_str().unwrap().to_string();
    let (status, outcome) = app
        .post(&format!("/api/v1/goals/{}/progress", goal_id), Some(&token), json!({"value": 500.0}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["goal"]["current_value"], 500.0);
    assert_eq!(outcome["entry"]["value"], 500.0);

    let (status, goals) = app.get("/api/v1/goals?status=active", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(goals.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_goal_validation_and_ownership() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (_, ana_token) = app.user("ana").await;
    let (_, ben_token) = app.user("ben").await;

    let mut past = hydration_goal();
    past["target_date"] = json!("2024-06-01");
    let (status, _) = app.post("/api/v1/goals", Some(&ana_token), past).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, goal) = app.post("/api/v1/goals", Some(&ana_token), hydration_goal()).await;
    let uri = format!("/api/v1/goals/{}", goal["id"].as_str().unwrap());

    let (status, _) = app.get(&uri, Some(&ben_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&ana_token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
