use axum::http::StatusCode;
use serde_json::json;

use super::{auth_enforced, TestApp};

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (_, user_token) = app.user("ana").await;
    let (_, admin_token) = app.admin("root_admin").await;

    let (status, body) = app.get("/api/v1/admin/stats", Some(&user_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app.get("/api/v1/admin/stats", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, stats) = app.get("/api/v1/admin/stats", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_users"], 2);
    assert_eq!(stats["active_users"], 2);
}

#[tokio::test]
async fn test_ban_and_unban() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (ana, ana_token) = app.user("ana").await;
    let (_, admin_token) = app.admin("root_admin").await;

    let (status, banned) = app
        .post(&format!("/api/v1/admin/users/{}/ban", ana.id), Some(&admin_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(banned["is_active"], false);

    let (status, _) = app.get("/api/v1/users/me", Some(&ana_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, reinstated) = app
        .post(&format!("/api/v1/admin/users/{}/unban", ana.id), Some(&admin_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reinstated["is_active"], true);

    let (status, _) = app.get("/api/v1/users/me", Some(&ana_token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_banned_account_is_rejected_once_revocations_are_gone() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (ana, ana_token) = app.user("ana").await;
    let (_, admin_token) = app.admin("root_admin").await;

    let (status, _) = app
        .post(&format!("/api/v1/admin/users/{}/ban", ana.id), Some(&admin_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    water_tracker_domain::auth::token::restore_user(&ana.id);

    let (status, body) = app.post("/api/v1/logs", Some(&ana_token), json!({"volume_ml": 250})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is not active");
    let account = app.ctx.services.users.get_user(&ana.id).await.unwrap();
    assert_eq!(account.xp, 0);
}

#[tokio::test]
async fn test_user_listing_and_lookup() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    app.user("ana").await;
    app.user("ben").await;
    let (_, admin_token) = app.admin("root_admin").await;

    let (status, page) = app.get("/api/v1/admin/users?limit=2", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["users"].as_array().unwrap().len(), 2);

    let (status, found) = app.get("/api/v1/admin/users/by-username/ben", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["username"], "ben");

    let (status, _) = app.get("/api/v1/admin/users/by-username/nobody", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_announcement_skips_unknown_users() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (ben, _) = app.user("ben").await;
    let (_, admin_token) = app.admin("root_admin").await;

    let (status, body) = app
        .post(
            "/api/v1/admin/announcements",
            Some(&admin_token),
            json!({"user_ids": [ben.id, "ghost"], "title": "Maintenance", "message": "Back soon"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_admin_manages_the_catalogue() {
    if !auth_enforced() {
        return;
    }
    let app = TestApp::new();
    let (_, admin_token) = app.admin("root_admin").await;

    let (status, created) = app
        .post(
            "/api/v1/admin/water",
            Some(&admin_token),
            json!({"name": "Glacier Spring", "brand_name": "Alpine", "score": 82.0, "packaging": "glass"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, product) = app.get(&format!("/api/v1/water/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["name"], "Glacier Spring");

    let (status, _) = app.delete(&format!("/api/v1/admin/water/{}", id), Some(&admin_token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/v1/water/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
