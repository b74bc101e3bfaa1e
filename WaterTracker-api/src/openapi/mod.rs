use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the `bearer` scheme the paths refer to
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        crate::api::handlers::health::health_check,

        // Authentication
        crate::api::handlers::auth::register,
        crate::api::handlers::auth::refresh_token,
        crate::api::handlers::auth::logout,
        crate::api::handlers::auth::auth_info,

        // Users
        crate::api::handlers::users::get_me,
        crate::api::handlers::users::get_user,
        crate::api::handlers::users::get_profile,
        crate::api::handlers::users::update_user,
        crate::api::handlers::users::deactivate_user,

        // Water catalogue
        crate::api::handlers::water::search_products,
        crate::api::handlers::water::get_product,
        crate::api::handlers::water::get_summary,
        crate::api::handlers::water::top_rated,
        crate::api::handlers::water::list_brands,
        crate::api::handlers::water::list_packaging_types,
        crate::api::handlers::water::create_product,
        crate::api::handlers::water::update_product,
        crate::api::handlers::water::delete_product,
        crate::api::handlers::water::import_products,

        // Water logs
        crate::api::handlers::water_logs::log_water,
        crate::api::handlers::water_logs::search_logs,
        crate::api::handlers::water_logs::get_log,
        crate::api::handlers::water_logs::update_log,
        crate::api::handlers::water_logs::delete_log,
        crate::api::handlers::water_logs::daily_summary,
        crate::api::handlers::water_logs::analytics,

        // Goals
        crate::api::handlers::goals::create_goal,
        crate::api::handlers::goals::list_goals,
        crate::api::handlers::goals::goal_stats,
        crate::api::handlers::goals::get_goal,
        crate::api::handlers::goals::update_goal,
        crate::api::handlers::goals::delete_goal,
        crate::api::handlers::goals::log_progress,
        crate::api::handlers::goals::progress_view,
        crate::api::handlers::goals::goal_summary,

        // Achievements
        crate::api::handlers::achievements::list_catalog,
        crate::api::handlers::achievements::list_user_achievements,
        crate::api::handlers::achievements::check_achievements,

        // Notifications
        crate::api::handlers::notifications::list_notifications,
        crate::api::handlers::notifications::unread_count,
        crate::api::handlers::notifications::mark_all_as_read,
        crate::api::handlers::notifications::get_notification,
        crate::api::handlers::notifications::mark_as_read,
        crate::api::handlers::notifications::delete_notification,
        crate::api::handlers::notifications::get_settings,
        crate::api::handlers::notifications::update_settings,

        // Reminders
        crate::api::handlers::reminders::create_reminder,
        crate::api::handlers::reminders::list_reminders,
        crate::api::handlers::reminders::get_reminder,
        crate::api::handlers::reminders::update_reminder,
        crate::api::handlers::reminders::delete_reminder,

        // Social
        crate::api::handlers::social::send_friend_request,
        crate::api::handlers::social::list_pending,
        crate::api::handlers::social::respond_to_request,
        crate::api::handlers::social::list_friends,
        crate::api::handlers::social::activity_feed,
        crate::api::handlers::social::leaderboard,

        // Reports
        crate::api::handlers::reports::generate_report,
        crate::api::handlers::reports::list_reports,
        crate::api::handlers::reports::get_report,
        crate::api::handlers::reports::delete_report,

        // GDPR
        crate::api::handlers::gdpr::create_request,
        crate::api::handlers::gdpr::list_requests,
        crate::api::handlers::gdpr::get_request,
        crate::api::handlers::gdpr::list_all_requests,
        crate::api::handlers::gdpr::update_request_status,

        // Admin
        crate::api::handlers::admin::site_stats,
        crate::api::handlers::admin::list_users,
        crate::api::handlers::admin::find_user_by_username,
        crate::api::handlers::admin::set_role,
        crate::api::handlers::admin::ban_user,
        crate::api::handlers::admin::unban_user,
        crate::api::handlers::admin::send_announcement,
    ),
    components(
        schemas(
            // Shared
            crate::api::error::ErrorResponse,
            crate::entities::common::UserListResponse,
            crate::entities::common::CountResponse,
            crate::entities::common::MessageResponse,
            crate::entities::auth::RegistrationResponse,
            crate::entities::auth::RefreshRequest,
            crate::entities::auth::AuthInfoResponse,
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentStatus,
            crate::api::handlers::health::ComponentHealthStatus,

            // Auth
            water_tracker_domain::auth::TokenPair,
            water_tracker_domain::auth::UserInfo,
            water_tracker_domain::auth::Claims,

            // Users
            water_tracker_domain::entities::user::User,
            water_tracker_domain::entities::user::UserRole,
            water_tracker_domain::entities::user::CreateUserRequest,
            water_tracker_domain::entities::user::UpdateUserRequest,
            water_tracker_domain::entities::user::SetRoleRequest,
            water_tracker_domain::entities::user::UserProfile,
            water_tracker_domain::entities::user::LevelProgress,
            water_tracker_domain::entities::user::UserStats,

            // Water catalogue
            water_tracker_domain::entities::water::WaterProduct,
            water_tracker_domain::entities::water::WaterProductDetails,
            water_tracker_domain::entities::water::Ingredient,
            water_tracker_domain::entities::water::Source,
            water_tracker_domain::entities::water::ScoreBreakdownItem,
            water_tracker_domain::entities::water::HealthStatus,
            water_tracker_domain::entities::water::MicroplasticsRisk,
            water_tracker_domain::entities::water::ProductSortField,
            water_tracker_domain::entities::water::SortOrder,
            water_tracker_domain::entities::water::ProductPage,
            water_tracker_domain::entities::water::WaterSummary,
            water_tracker_domain::entities::water::ImportSummary,
            water_tracker_domain::entities::water::CreateWaterProductRequest,
            water_tracker_domain::entities::water::UpdateWaterProductRequest,

            // Water logs
            water_tracker_domain::entities::water_log::WaterLog,
            water_tracker_domain::entities::water_log::CreateWaterLogRequest,
            water_tracker_domain::entities::water_log::UpdateWaterLogRequest,
            water_tracker_domain::entities::water_log::LogPage,
            water_tracker_domain::entities::water_log::DailySummary,
            water_tracker_domain::entities::water_log::HydrationAnalytics,

            // Goals
            water_tracker_domain::entities::goal::HealthGoal,
            water_tracker_domain::entities::goal::GoalType,
            water_tracker_domain::entities::goal::GoalStatus,
            water_tracker_domain::entities::goal::GoalPriority,
            water_tracker_domain::entities::goal::GoalFrequency,
            water_tracker_domain::entities::goal::Milestone,
            water_tracker_domain::entities::goal::MilestoneInput,
            water_tracker_domain::entities::goal::CreateGoalRequest,
            water_tracker_domain::entities::goal::UpdateGoalRequest,
            water_tracker_domain::entities::goal::LogProgressRequest,
            water_tracker_domain::entities::goal::GoalProgressEntry,
            water_tracker_domain::entities::goal::GoalAchievement,
            water_tracker_domain::entities::goal::ProgressOutcome,
            water_tracker_domain::entities::goal::GoalProgressView,
            water_tracker_domain::entities::goal::GoalSummary,
            water_tracker_domain::entities::goal::GoalStats,

            // Achievements
            water_tracker_domain::entities::achievement::AchievementDefinition,
            water_tracker_domain::entities::achievement::AchievementCriteria,
            water_tracker_domain::entities::achievement::CriteriaType,
            water_tracker_domain::entities::achievement::UserAchievement,

            // Notifications
            water_tracker_domain::entities::notification::Notification,
            water_tracker_domain::entities::notification::NotificationType,
            water_tracker_domain::entities::notification::NotificationPriority,
            water_tracker_domain::entities::notification::NotificationStatus,
            water_tracker_domain::entities::notification::NotificationList,
            water_tracker_domain::entities::notification::NotificationSettings,
            water_tracker_domain::entities::notification::UpdateNotificationSettingsRequest,

            // Reminders
            water_tracker_domain::entities::reminder::Reminder,
            water_tracker_domain::entities::reminder::CreateReminderRequest,
            water_tracker_domain::entities::reminder::UpdateReminderRequest,

            // Social
            water_tracker_domain::entities::social::Friendship,
            water_tracker_domain::entities::social::FriendshipStatus,
            water_tracker_domain::entities::social::FriendAction,
            water_tracker_domain::entities::social::FriendRequest,
            water_tracker_domain::entities::social::RespondFriendRequest,
            water_tracker_domain::entities::social::Friend,
            water_tracker_domain::entities::social::Activity,
            water_tracker_domain::entities::social::LeaderboardEntry,

            // Reports
            water_tracker_domain::entities::report::Report,
            water_tracker_domain::entities::report::ReportType,
            water_tracker_domain::entities::report::ReportStatus,
            water_tracker_domain::entities::report::GenerateReportRequest,

            // GDPR
            water_tracker_domain::entities::gdpr::GdprRequest,
            water_tracker_domain::entities::gdpr::GdprRequestType,
            water_tracker_domain::entities::gdpr::GdprRequestStatus,
            water_tracker_domain::entities::gdpr::CreateGdprRequest,
            water_tracker_domain::entities::gdpr::UpdateGdprStatusRequest,

            // Admin
            water_tracker_domain::entities::admin::SiteStats,
            water_tracker_domain::entities::admin::AnnouncementRequest,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "Authentication", description = "Token refresh and session endpoints"),
        (name = "users", description = "Accounts and profiles"),
        (name = "water", description = "Water product catalogue"),
        (name = "water_logs", description = "Water intake logging and analytics"),
        (name = "goals", description = "Health goals, progress and milestones"),
        (name = "achievements", description = "Achievement catalogue and stages"),
        (name = "notifications", description = "Notifications and delivery settings"),
        (name = "reminders", description = "Daily drink reminders"),
        (name = "social", description = "Friends, activity feed and leaderboard"),
        (name = "reports", description = "Generated reports"),
        (name = "gdpr", description = "Data-subject requests"),
        (name = "admin", description = "Administration")
    ),
    info(
        title = "WaterTracker API",
        version = "0.1.0",
        description = "API for tracking water intake, hydration goals and bottled water quality",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "WaterTracker API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().expect("tags are defined");
        assert!(tags.iter().any(|tag| tag.name == "water"));
        assert!(tags.iter().any(|tag| tag.name == "admin"));

        let paths = &openapi.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/api/v1/water/{id}"));
        assert!(paths.contains_key("/api/v1/logs"));
        assert!(paths.contains_key("/api/v1/goals/{id}/progress"));
        assert!(paths.contains_key("/api/v1/admin/gdpr/{id}"));
    }

    #[test]
    fn test_bearer_scheme_is_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components are defined");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
