use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::notification::NotificationPriority;

/// Site-wide counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SiteStats {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users_today: i64,
    pub total_water_logs: i64,
    pub total_volume_ml: i64,
    pub active_reminders: i64,
}

/// System announcement sent to a list of users
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AnnouncementRequest {
    #[validate(length(min = 1, message = "At least one recipient is required"))]
    pub user_ids: Vec<String>,
    #[validate(length(min = 1, max = 150, message = "Title must be between 1 and 150 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "Message must be between 1 and 1000 characters"))]
    pub message: String,
    pub priority: Option<NotificationPriority>,
}
