use std::collections::HashMap;
use uuid::Uuid;
use water_tracker_data::models as data;

use super::achievement::{AchievementCriteria, AchievementDefinition, UserAchievement};
use super::admin::SiteStats;
use super::gdpr::GdprRequest;
use super::goal::{GoalAchievement, GoalProgressEntry, HealthGoal};
use super::notification::{Notification, NotificationSettings};
use super::reminder::Reminder;
use super::report::Report;
use super::social::{Activity, Friendship, LeaderboardEntry};
use super::user::User;
use super::water::WaterProduct;
use super::water_log::WaterLog;

/// Conversion functions between domain entities and data models
/// These functions follow the pattern convert_to_[target_layer]_[model_name]

/// Helper function to safely parse a string ID to UUID
///
/// When an invalid UUID is provided, it returns a descriptive error message.
pub fn parse_string_to_uuid(id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(id).map_err(|_| format!("Invalid UUID format: {}", id))
}

/// Fresh identifier for a user-owned record
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn json_field<T: serde::de::DeserializeOwned>(value: serde_json::Value, field: &str) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| format!("Invalid {} column: {}", field, e))
}

fn to_json_field<T: serde::Serialize>(value: &T, field: &str) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Cannot encode {}: {}", field, e))
}

pub fn convert_to_domain_user(user: data::user::User) -> Result<User, String> {
    Ok(User {
        role: user.role.parse()?,
        id: user.id,
        username: user.username,
        email: user.email,
        is_active: user.is_active,
        daily_goal_ml: user.daily_goal_ml,
        current_streak: user.current_streak,
        longest_streak: user.longest_streak,
        last_log_date: user.last_log_date,
        xp: user.xp,
        points: user.points,
        level: user.level,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}

pub fn convert_to_data_user(user: &User) -> data::user::User {
    data::user::User {
        id: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role.to_string(),
        is_active: user.is_active,
        daily_goal_ml: user.daily_goal_ml,
        current_streak: user.current_streak,
        longest_streak: user.longest_streak,
        last_log_date: user.last_log_date,
        xp: user.xp,
        points: user.points,
        level: user.level,
        created_at: user.created_at,
        updated_at: user.updated_at,
        deleted_at: None,
    }
}

pub fn convert_to_domain_product(product: data::water_product::WaterProduct) -> Result<WaterProduct, String> {
    Ok(WaterProduct {
        id: product.id,
        name: product.name,
        brand_name: product.brand_name,
        score: product.score,
        description: product.description,
        image: product.image,
        packaging: product.packaging,
        ph_level: product.ph_level,
        tds: product.tds,
        ingredients: json_field(product.ingredients, "ingredients")?,
        sources: json_field(product.sources, "sources")?,
        score_breakdown: json_field(product.score_breakdown, "score_breakdown")?,
    })
}

pub fn convert_to_data_product(
    product: &WaterProduct,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
) -> Result<data::water_product::WaterProduct, String> {
    Ok(data::water_product::WaterProduct {
        id: product.id,
        name: product.name.clone(),
        brand_name: product.brand_name.clone(),
        score: product.score,
        description: product.description.clone(),
        image: product.image.clone(),
        packaging: product.packaging.clone(),
        ph_level: product.ph_level,
        tds: product.tds,
        ingredients: to_json_field(&product.ingredients, "ingredients")?,
        sources: to_json_field(&product.sources, "sources")?,
        score_breakdown: to_json_field(&product.score_breakdown, "score_breakdown")?,
        created_at,
        updated_at,
    })
}

pub fn convert_to_domain_log(log: data::water_log::WaterLog) -> WaterLog {
    WaterLog {
        id: log.id,
        user_id: log.user_id,
        water_id: log.water_id,
        volume_ml: log.volume_ml,
        drink_type: log.drink_type,
        caffeine_mg: log.caffeine_mg,
        logged_at: log.logged_at,
        created_at: log.created_at,
        updated_at: log.updated_at,
    }
}

pub fn convert_to_data_log(log: &WaterLog) -> data::water_log::WaterLog {
    data::water_log::WaterLog {
        id: log.id.clone(),
        user_id: log.user_id.clone(),
        water_id: log.water_id,
        volume_ml: log.volume_ml,
        drink_type: log.drink_type.clone(),
        caffeine_mg: log.caffeine_mg,
        logged_at: log.logged_at,
        created_at: log.created_at,
        updated_at: log.updated_at,
        deleted_at: None,
    }
}

pub fn convert_to_domain_goal(goal: data::health_goal::HealthGoal) -> Result<HealthGoal, String> {
    Ok(HealthGoal {
        goal_type: goal.goal_type.parse()?,
        frequency: goal.frequency.parse()?,
        priority: goal.priority.parse()?,
        status: goal.status.parse()?,
        tags: json_field(goal.tags, "tags")?,
        milestones: json_field(goal.milestones, "milestones")?,
        id: goal.id,
        user_id: goal.user_id,
        name: goal.name,
        description: goal.description,
        target_value: goal.target_value,
        current_value: goal.current_value,
        unit: goal.unit,
        difficulty: goal.difficulty,
        start_date: goal.start_date,
        target_date: goal.target_date,
        motivation: goal.motivation,
        created_at: goal.created_at,
        updated_at: goal.updated_at,
        completed_at: goal.completed_at,
    })
}

pub fn convert_to_data_goal(goal: &HealthGoal) -> Result<data::health_goal::HealthGoal, String> {
    Ok(data::health_goal::HealthGoal {
        id: goal.id.clone(),
        user_id: goal.user_id.clone(),
        name: goal.name.clone(),
        description: goal.description.clone(),
        goal_type: goal.goal_type.to_string(),
        target_value: goal.target_value,
        current_value: goal.current_value,
        unit: goal.unit.clone(),
        frequency: goal.frequency.to_string(),
        priority: goal.priority.to_string(),
        difficulty: goal.difficulty,
        status: goal.status.to_string(),
        start_date: goal.start_date,
        target_date: goal.target_date,
        motivation: goal.motivation.clone(),
        tags: to_json_field(&goal.tags, "tags")?,
        milestones: to_json_field(&goal.milestones, "milestones")?,
        created_at: goal.created_at,
        updated_at: goal.updated_at,
        completed_at: goal.completed_at,
        deleted_at: None,
    })
}

pub fn convert_to_domain_progress(entry: data::health_goal::GoalProgress) -> GoalProgressEntry {
    GoalProgressEntry {
        id: entry.id,
        goal_id: entry.goal_id,
        user_id: entry.user_id,
        value: entry.value,
        notes: entry.notes,
        recorded_at: entry.recorded_at,
    }
}

pub fn convert_to_data_progress(entry: &GoalProgressEntry) -> data::health_goal::GoalProgress {
    data::health_goal::GoalProgress {
        id: entry.id.clone(),
        goal_id: entry.goal_id.clone(),
        user_id: entry.user_id.clone(),
        value: entry.value,
        notes: entry.notes.clone(),
        recorded_at: entry.recorded_at,
    }
}

pub fn convert_to_domain_goal_achievement(achievement: data::health_goal::GoalAchievement) -> GoalAchievement {
    GoalAchievement {
        id: achievement.id,
        user_id: achievement.user_id,
        goal_id: achievement.goal_id,
        milestone_name: achievement.milestone_name,
        points: achievement.points,
        message: achievement.message,
        earned_at: achievement.earned_at,
    }
}

pub fn convert_to_data_goal_achievement(achievement: &GoalAchievement) -> data::health_goal::GoalAchievement {
    data::health_goal::GoalAchievement {
        id: achievement.id.clone(),
        user_id: achievement.user_id.clone(),
        goal_id: achievement.goal_id.clone(),
        milestone_name: achievement.milestone_name.clone(),
        points: achievement.points,
        message: achievement.message.clone(),
        earned_at: achievement.earned_at,
    }
}

pub fn convert_to_domain_definition(
    definition: data::achievement::AchievementDefinition,
) -> Result<AchievementDefinition, String> {
    Ok(AchievementDefinition {
        total_stages: definition.criteria_values.len(),
        criteria: AchievementCriteria {
            criteria_type: definition.criteria_type.parse()?,
            values: definition.criteria_values,
        },
        id: definition.id,
        name: definition.name,
        description: definition.description,
    })
}

pub fn convert_to_data_definition(definition: &AchievementDefinition) -> data::achievement::AchievementDefinition {
    data::achievement::AchievementDefinition {
        id: definition.id.clone(),
        name: definition.name.clone(),
        description: definition.description.clone(),
        criteria_type: definition.criteria.criteria_type.to_string(),
        criteria_values: definition.criteria.values.clone(),
    }
}

pub fn convert_to_domain_user_achievement(achievement: data::achievement::UserAchievement) -> UserAchievement {
    UserAchievement {
        id: achievement.id,
        user_id: achievement.user_id,
        achievement_id: achievement.achievement_id,
        stage: achievement.stage,
        earned_at: achievement.earned_at,
    }
}

pub fn convert_to_domain_notification(notification: data::notification::Notification) -> Result<Notification, String> {
    Ok(Notification {
        notification_type: notification.notification_type.parse()?,
        priority: notification.priority.parse()?,
        status: notification.status.parse()?,
        id: notification.id,
        user_id: notification.user_id,
        title: notification.title,
        message: notification.message,
        created_at: notification.created_at,
        read_at: notification.read_at,
        related_entity_id: notification.related_entity_id,
        related_entity_type: notification.related_entity_type,
        payload: notification.payload,
        action_url: notification.action_url,
    })
}

pub fn convert_to_data_notification(notification: &Notification) -> data::notification::Notification {
    data::notification::Notification {
        id: notification.id.clone(),
        user_id: notification.user_id.clone(),
        notification_type: notification.notification_type.to_string(),
        title: notification.title.clone(),
        message: notification.message.clone(),
        priority: notification.priority.to_string(),
        status: notification.status.to_string(),
        created_at: notification.created_at,
        read_at: notification.read_at,
        related_entity_id: notification.related_entity_id.clone(),
        related_entity_type: notification.related_entity_type.clone(),
        payload: notification.payload.clone(),
        action_url: notification.action_url.clone(),
    }
}

/// Unknown type names in stored preferences are dropped
pub fn convert_to_domain_settings(settings: data::notification::NotificationSettings) -> NotificationSettings {
    NotificationSettings {
        type_preferences: settings
            .type_preferences
            .into_iter()
            .filter_map(|(key, enabled)| key.parse().ok().map(|t| (t, enabled)))
            .collect(),
        user_id: settings.user_id,
        master_enabled: settings.master_enabled,
        quiet_hours_enabled: settings.quiet_hours_enabled,
        quiet_hours_start: settings.quiet_hours_start,
        quiet_hours_end: settings.quiet_hours_end,
        updated_at: settings.updated_at,
    }
}

pub fn convert_to_data_settings(settings: &NotificationSettings) -> data::notification::NotificationSettings {
    data::notification::NotificationSettings {
        user_id: settings.user_id.clone(),
        master_enabled: settings.master_enabled,
        type_preferences: settings
            .type_preferences
            .iter()
            .map(|(t, enabled)| (t.to_string(), *enabled))
            .collect::<HashMap<_, _>>(),
        quiet_hours_enabled: settings.quiet_hours_enabled,
        quiet_hours_start: settings.quiet_hours_start.clone(),
        quiet_hours_end: settings.quiet_hours_end.clone(),
        updated_at: settings.updated_at,
    }
}

pub fn convert_to_domain_reminder(reminder: data::reminder::Reminder) -> Reminder {
    Reminder {
        id: reminder.id,
        user_id: reminder.user_id,
        message: reminder.message,
        time_of_day: reminder.time_of_day,
        is_active: reminder.is_active,
        last_sent_on: reminder.last_sent_on,
        created_at: reminder.created_at,
        updated_at: reminder.updated_at,
    }
}

pub fn convert_to_data_reminder(reminder: &Reminder) -> data::reminder::Reminder {
    data::reminder::Reminder {
        id: reminder.id.clone(),
        user_id: reminder.user_id.clone(),
        message: reminder.message.clone(),
        time_of_day: reminder.time_of_day.clone(),
        is_active: reminder.is_active,
        last_sent_on: reminder.last_sent_on,
        created_at: reminder.created_at,
        updated_at: reminder.updated_at,
    }
}

pub fn convert_to_domain_friendship(friendship: data::social::Friendship) -> Result<Friendship, String> {
    Ok(Friendship {
        status: friendship.status.parse()?,
        id: friendship.id,
        requester_id: friendship.requester_id,
        addressee_id: friendship.addressee_id,
        created_at: friendship.created_at,
        updated_at: friendship.updated_at,
    })
}

pub fn convert_to_data_friendship(friendship: &Friendship) -> data::social::Friendship {
    data::social::Friendship {
        id: friendship.id.clone(),
        requester_id: friendship.requester_id.clone(),
        addressee_id: friendship.addressee_id.clone(),
        status: friendship.status.to_string(),
        created_at: friendship.created_at,
        updated_at: friendship.updated_at,
    }
}

pub fn convert_to_domain_activity(activity: data::social::Activity) -> Activity {
    Activity {
        id: activity.id,
        user_id: activity.user_id,
        activity_type: activity.activity_type,
        data: activity.data,
        created_at: activity.created_at,
    }
}

pub fn convert_to_data_activity(activity: &Activity) -> data::social::Activity {
    data::social::Activity {
        id: activity.id.clone(),
        user_id: activity.user_id.clone(),
        activity_type: activity.activity_type.clone(),
        data: activity.data.clone(),
        created_at: activity.created_at,
    }
}

/// Rank rows in the order they were returned
pub fn convert_to_domain_leaderboard(rows: Vec<data::social::LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| LeaderboardEntry {
            rank: index + 1,
            user_id: row.user_id,
            username: row.username,
            points: row.points,
            xp: row.xp,
            level: row.level,
            current_streak: row.current_streak,
        })
        .collect()
}

pub fn convert_to_domain_report(report: data::report::Report) -> Result<Report, String> {
    Ok(Report {
        report_type: report.report_type.parse()?,
        status: report.status.parse()?,
        id: report.id,
        user_id: report.user_id,
        title: report.title,
        period_start: report.period_start,
        period_end: report.period_end,
        content: report.content,
        created_at: report.created_at,
    })
}

pub fn convert_to_data_report(report: &Report) -> data::report::Report {
    data::report::Report {
        id: report.id.clone(),
        user_id: report.user_id.clone(),
        report_type: report.report_type.to_string(),
        title: report.title.clone(),
        period_start: report.period_start,
        period_end: report.period_end,
        status: report.status.to_string(),
        content: report.content.clone(),
        created_at: report.created_at,
    }
}

pub fn convert_to_domain_gdpr_request(request: data::gdpr::GdprRequest) -> Result<GdprRequest, String> {
    Ok(GdprRequest {
        request_type: request.request_type.parse()?,
        status: request.status.parse()?,
        id: request.id,
        user_id: request.user_id,
        data_categories: request.data_categories,
        reason: request.reason,
        deadline: request.deadline,
        submitted_at: request.submitted_at,
        processed_at: request.processed_at,
        completed_at: request.completed_at,
        response_data: request.response_data,
        notes: request.notes,
    })
}

pub fn convert_to_data_gdpr_request(request: &GdprRequest) -> data::gdpr::GdprRequest {
    data::gdpr::GdprRequest {
        id: request.id.clone(),
        user_id: request.user_id.clone(),
        request_type: request.request_type.to_string(),
        data_categories: request.data_categories.clone(),
        reason: request.reason.clone(),
        status: request.status.to_string(),
        deadline: request.deadline,
        submitted_at: request.submitted_at,
        processed_at: request.processed_at,
        completed_at: request.completed_at,
        response_data: request.response_data.clone(),
        notes: request.notes.clone(),
    }
}

pub fn convert_to_domain_site_stats(stats: data::user::SiteStats) -> SiteStats {
    SiteStats {
        total_users: stats.total_users,
        active_users: stats.active_users,
        new_users_today: stats.new_users_today,
        total_water_logs: stats.total_water_logs,
        total_volume_ml: stats.total_volume_ml,
        active_reminders: stats.active_reminders,
    }
}
