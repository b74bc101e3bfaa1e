use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, NaiveTime, Utc};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::validation::{parse_time_of_day, validate_time_of_day};

string_enum!(
    NotificationType {
        RecallAlert => "recall_alert",
        NewProduct => "new_product",
        HealthWarning => "health_warning",
        GoalMilestone => "goal_milestone",
        GoalReminder => "goal_reminder",
        ReviewResponse => "review_response",
        SystemAnnouncement => "system_announcement",
        NewRecommendation => "new_recommendation",
        AchievementUnlocked => "achievement_unlocked",
        FriendRequest => "friend_request",
    }
);

string_enum!(
    NotificationPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
);

string_enum!(
    NotificationStatus {
        Unread => "unread",
        Read => "read",
        Archived => "archived",
        Deleted => "deleted",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
    pub payload: Value,
    pub action_url: Option<String>,
}

/// A notification about to be created
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    #[validate(length(min = 1, max = 150, message = "Title must be between 1 and 150 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "Message must be between 1 and 1000 characters"))]
    pub message: String,
    pub priority: NotificationPriority,
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
    #[serde(default)]
    pub payload: Value,
    pub action_url: Option<String>,
}

impl NewNotification {
    pub fn new(
        user_id: &str,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            notification_type,
            title: title.into(),
            message: message.into(),
            priority: NotificationPriority::Medium,
            related_entity_id: None,
            related_entity_type: None,
            payload: Value::Object(Default::default()),
            action_url: None,
        }
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_related(mut self, entity_type: &str, entity_id: &str) -> Self {
        self.related_entity_type = Some(entity_type.to_string());
        self.related_entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Delivery preferences of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct NotificationSettings {
    pub user_id: String,
    pub master_enabled: bool,
    /// Per-type switches; a missing type is enabled
    pub type_preferences: BTreeMap<NotificationType, bool>,
    pub quiet_hours_enabled: bool,
    /// "HH:MM"
    pub quiet_hours_start: Option<String>,
    /// "HH:MM"
    pub quiet_hours_end: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationSettings {
    /// Everything enabled, no quiet hours
    pub fn defaults(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            master_enabled: true,
            type_preferences: NotificationType::ALL.iter().map(|t| (*t, true)).collect(),
            quiet_hours_enabled: false,
            quiet_hours_start: None,
            quiet_hours_end: None,
            updated_at: now,
        }
    }

    pub fn type_enabled(&self, notification_type: NotificationType) -> bool {
        self.type_preferences.get(&notification_type).copied().unwrap_or(true)
    }

    /// Whether `time` falls in the quiet window. The window may wrap past midnight.
    pub fn in_quiet_hours(&self, time: NaiveTime) -> bool {
        if !self.quiet_hours_enabled {
            return false;
        }
        let start = self.quiet_hours_start.as_deref().and_then(parse_time_of_day);
        let end = self.quiet_hours_end.as_deref().and_then(parse_time_of_day);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => time >= start && time < end,
            (Some(start), Some(end)) => time >= start || time < end,
            _ => false,
        }
    }

    /// Whether a notification of this type may be pushed at `now`
    pub fn allows_delivery(&self, notification_type: NotificationType, now: DateTime<Utc>) -> bool {
        self.master_enabled && self.type_enabled(notification_type) && !self.in_quiet_hours(now.time())
    }
}

/// Partial update of notification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateNotificationSettingsRequest {
    pub master_enabled: Option<bool>,
    /// Merged into the stored switches
    pub type_preferences: Option<BTreeMap<NotificationType, bool>>,
    pub quiet_hours_enabled: Option<bool>,
    #[validate(custom = "validate_time_of_day")]
    pub quiet_hours_start: Option<String>,
    #[validate(custom = "validate_time_of_day")]
    pub quiet_hours_end: Option<String>,
}

/// A page of notifications with the unread count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub total: usize,
    pub unread_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
    }

    fn quiet(start: &str, end: &str) -> NotificationSettings {
        let mut settings = NotificationSettings::defaults("u1", at(0, 0));
        settings.quiet_hours_enabled = true;
        settings.quiet_hours_start = Some(start.to_string());
        settings.quiet_hours_end = Some(end.to_string());
        settings
    }

    #[test]
    fn test_quiet_hours_wrapping_midnight() {
        let settings = quiet("22:00", "07:00");
        assert!(settings.in_quiet_hours(at(23, 30).time()));
        assert!(settings.in_quiet_hours(at(3, 0).time()));
        assert!(!settings.in_quiet_hours(at(7, 0).time()));
        assert!(!settings.in_quiet_hours(at(12, 0).time()));
    }

    #[test]
    fn test_quiet_hours_same_day_window() {
        let settings = quiet("13:00", "14:30");
        assert!(settings.in_quiet_hours(at(13, 0).time()));
        assert!(settings.in_quiet_hours(at(14, 29).time()));
        assert!(!settings.in_quiet_hours(at(14, 30).time()));
    }

    #[test]
    fn test_delivery_filtering() {
        let mut settings = NotificationSettings::defaults("u1", at(0, 0));
        assert!(settings.allows_delivery(NotificationType::GoalReminder, at(9, 0)));

        settings.type_preferences.insert(NotificationType::GoalReminder, false);
        assert!(!settings.allows_delivery(NotificationType::GoalReminder, at(9, 0)));
        assert!(settings.allows_delivery(NotificationType::FriendRequest, at(9, 0)));

        settings.master_enabled = false;
        assert!(!settings.allows_delivery(NotificationType::FriendRequest, at(9, 0)));
    }

    #[test]
    fn test_settings_request_rejects_bad_times() {
        let request = UpdateNotificationSettingsRequest {
            quiet_hours_start: Some("25:00".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
