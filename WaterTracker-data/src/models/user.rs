use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

/// Storage model for a user account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique identifier (UUID string)
    pub id: String,
    pub username: String,
    pub email: String,
    /// "user" or "admin"
    pub role: String,
    pub is_active: bool,
    pub daily_goal_ml: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    /// Date of the most recent water log, used for streak tracking
    pub last_log_date: Option<NaiveDate>,
    pub xp: i64,
    pub points: i64,
    pub level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the account is soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Counters written back after a gamified action
#[derive(Debug, Clone, PartialEq)]
pub struct UserProgressUpdate {
    pub xp: i64,
    pub points: i64,
    pub level: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_log_date: Option<NaiveDate>,
}

/// Site-wide counters for the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiteStats {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users_today: i64,
    pub total_water_logs: i64,
    pub total_volume_ml: i64,
    pub active_reminders: i64,
}
