use axum::http::StatusCode;
use serde_json::json;

use super::{auth_enforced, TestApp};

#[tokio::test]
async fn test_access_request_completes_with_export() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (_, token) = app.user("ana").await;
    app.post("/api/v1/logs", Some(&token), json!({"volume_ml": 400})).await;

    let (status, request) = app.post("/api/v1/gdpr", Some(&token), json!({"request_type": "access"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "completed");
    assert!(!request["response_data"].is_null());
}

#[tokio::test]
async fn test_open_request_blocks_a_duplicate() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (_, token) = app.user("ana").await;

    let body = json!({"request_type": "rectification", "reason": "Wrong email on file"});
    let (status, filed) = app.post("/api/v1/gdpr", Some(&token), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(filed["status"], "pending");

    let (status, _) = app.post("/api/v1/gdpr", Some(&token), body).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_reviews_requests() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (_, token) = app.user("ana").await;
    let (_, admin_token) = app.admin("root_admin").await;

    let (_, filed) = app.post("/api/v1/gdpr", Some(&token), json!({"request_type": "restriction"})).await;
    let id = filed["id"].as_str().unwrap().to_string();

    let (status, _) = app.get("/api/v1/admin/gdpr", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, pending) = app.get("/api/v1/admin/gdpr?status=pending", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, updated) = app
        .put(
            &format!("/api/v1/admin/gdpr/{}", id),
            Some(&admin_token),
            json!({"status": "processing", "note": "Looking into it"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "processing");

    let (status, own) = app.get(&format!("/api/v1/gdpr/{}", id), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["status"], "processing");
}
