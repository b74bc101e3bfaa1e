use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, Level};

use water_tracker_domain::auth::{auth_middleware, authorize, configure_auth};

use crate::api::handlers::{
    achievements, admin, auth, gdpr, goals, health, notifications, reminders, reports, social, users, water,
    water_logs,
};
use crate::api::account::require_active_account;
use crate::api::state::AppState;
use crate::openapi::configure_swagger_routes;
use crate::ws::ws_handler;

/// Routes that need no token
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ws", get(ws_handler))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/api/v1/users", post(auth::register))
        .route("/api/v1/water", get(water::search_products))
        .route("/api/v1/water/summary", get(water::get_summary))
        .route("/api/v1/water/top-rated", get(water::top_rated))
        .route("/api/v1/water/brands", get(water::list_brands))
        .route("/api/v1/water/packaging-types", get(water::list_packaging_types))
        .route("/api/v1/water/:id", get(water::get_product))
}

/// Routes for any authenticated user
fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/info", get(auth::auth_info))
        .route("/auth/logout", post(auth::logout))
        // Users
        .route("/api/v1/users/me", get(users::get_me))
        .route(
            "/api/v1/users/:id",
            get(users::get_user).put(users::update_user).delete(users::deactivate_user),
        )
        .route("/api/v1/users/:id/profile", get(users::get_profile))
        // Water logs
        .route("/api/v1/logs", get(water_logs::search_logs).post(water_logs::log_water))
        .route("/api/v1/logs/summary", get(water_logs::daily_summary))
        .route("/api/v1/logs/analytics", get(water_logs::analytics))
        .route(
            "/api/v1/logs/:id",
            get(water_logs::get_log).put(water_logs::update_log).delete(water_logs::delete_log),
        )
        // Goals
        .route("/api/v1/goals", get(goals::list_goals).post(goals::create_goal))
        .route("/api/v1/goals/stats", get(goals::goal_stats))
        .route(
            "/api/v1/goals/:id",
            get(goals::get_goal).put(goals::update_goal).delete(goals::delete_goal),
        )
        .route("/api/v1/goals/:id/progress", get(goals::progress_view).post(goals::log_progress))
        .route("/api/v1/goals/:id/summary", get(goals::goal_summary))
        // Achievements
        .route("/api/v1/achievements", get(achievements::list_catalog))
        .route("/api/v1/achievements/me", get(achievements::list_user_achievements))
        .route("/api/v1/achievements/check", post(achievements::check_achievements))
        // Notifications
        .route("/api/v1/notifications", get(notifications::list_notifications))
        .route("/api/v1/notifications/unread-count", get(notifications::unread_count))
        .route("/api/v1/notifications/read-all", post(notifications::mark_all_as_read))
        .route(
            "/api/v1/notifications/settings",
            get(notifications::get_settings).put(notifications::update_settings),
        )
        .route(
            "/api/v1/notifications/:id",
            get(notifications::get_notification).delete(notifications::delete_notification),
        )
        .route("/api/v1/notifications/:id/read", post(notifications::mark_as_read))
        // Reminders
        .route("/api/v1/reminders", get(reminders::list_reminders).post(reminders::create_reminder))
        .route(
            "/api/v1/reminders/:id",
            get(reminders::get_reminder).put(reminders::update_reminder).delete(reminders::delete_reminder),
        )
        // Social
        .route("/api/v1/social/friends", get(social::list_friends))
        .route(
            "/api/v1/social/friends/requests",
            get(social::list_pending).post(social::send_friend_request),
        )
        .route("/api/v1/social/friends/requests/:id/respond", post(social::respond_to_request))
        .route("/api/v1/social/feed", get(social::activity_feed))
        .route("/api/v1/social/leaderboard", get(social::leaderboard))
        // Reports
        .route("/api/v1/reports", get(reports::list_reports).post(reports::generate_report))
        .route("/api/v1/reports/:id", get(reports::get_report).delete(reports::delete_report))
        // GDPR
        .route("/api/v1/gdpr", get(gdpr::list_requests).post(gdpr::create_request))
        .route("/api/v1/gdpr/:id", get(gdpr::get_request))
        .layer(middleware::from_fn_with_state(state.clone(), require_active_account))
        .layer(middleware::from_fn(auth_middleware))
}

/// Routes for administrators
fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/stats", get(admin::site_stats))
        .route("/api/v1/admin/users", get(admin::list_users))
        .route("/api/v1/admin/users/by-username/:username", get(admin::find_user_by_username))
        .route("/api/v1/admin/users/:id/role", put(admin::set_role))
        .route("/api/v1/admin/users/:id/ban", post(admin::ban_user))
        .route("/api/v1/admin/users/:id/unban", post(admin::unban_user))
        .route("/api/v1/admin/announcements", post(admin::send_announcement))
        .route("/api/v1/admin/water", post(water::create_product))
        .route("/api/v1/admin/water/import", post(water::import_products))
        .route("/api/v1/admin/water/:id", put(water::update_product).delete(water::delete_product))
        .route("/api/v1/admin/gdpr", get(gdpr::list_all_requests))
        .route("/api/v1/admin/gdpr/:id", put(gdpr::update_request_status))
        .layer(middleware::from_fn(authorize::require_role("admin")))
        .layer(middleware::from_fn_with_state(state.clone(), require_active_account))
        // Authentication must happen before authorization
        .layer(middleware::from_fn(auth_middleware))
}

/// Assemble every route around the given state
pub fn create_router(state: AppState) -> Router {
    let app = Router::new()
        .merge(public_routes())
        .merge(user_routes(&state))
        .merge(admin_routes(&state))
        .with_state(state);
    debug!("Routes merged");

    let app = add_swagger_ui(app).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );
    let app = configure_auth(app);
    debug!("Security configuration applied");

    health::initialize_server_start_time();
    app
}

/// Router on the application database with a fresh WebSocket registry
pub fn create_app() -> (Router, AppState) {
    let state = AppState::from_environment();
    (create_router(state.clone()), state)
}

/// Add Swagger UI to the router
pub fn add_swagger_ui(app: Router) -> Router {
    app.merge(configure_swagger_routes())
}
