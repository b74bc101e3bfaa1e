use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, Utc};

/// Storage model for an in-app notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub priority: String,
    /// unread, read, archived or deleted
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
    pub payload: Value,
    pub action_url: Option<String>,
}

/// Per-user delivery preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    pub user_id: String,
    pub master_enabled: bool,
    /// Notification type name to enabled flag. Missing types are enabled.
    pub type_preferences: HashMap<String, bool>,
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub updated_at: DateTime<Utc>,
}
