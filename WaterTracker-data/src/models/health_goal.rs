use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, NaiveDate, Utc};

/// Storage model for a health goal. Enumerations are stored as their
/// snake_case names; tags and milestones as JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthGoal {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub goal_type: String,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: String,
    pub frequency: String,
    pub priority: String,
    pub difficulty: i64,
    pub status: String,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub motivation: Option<String>,
    pub tags: Value,
    pub milestones: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One recorded progress value for a goal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalProgress {
    pub id: String,
    pub goal_id: String,
    pub user_id: String,
    pub value: f64,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// A reached goal milestone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalAchievement {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub milestone_name: String,
    pub points: i64,
    pub message: String,
    pub earned_at: DateTime<Utc>,
}
