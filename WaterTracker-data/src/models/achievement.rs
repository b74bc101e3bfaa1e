use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Catalogue entry describing a staged achievement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AchievementDefinition {
    /// Slug, e.g. "first_sip"
    pub id: String,
    pub name: String,
    pub description: String,
    /// "log_count" or "total_volume"
    pub criteria_type: String,
    /// Stage thresholds in ascending order
    pub criteria_values: Vec<i64>,
}

/// Highest stage a user has reached for an achievement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAchievement {
    pub id: String,
    pub user_id: String,
    pub achievement_id: String,
    pub stage: i64,
    pub earned_at: DateTime<Utc>,
}
