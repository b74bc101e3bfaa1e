use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::validation::validate_time_of_day;

pub const DEFAULT_REMINDER_MESSAGE: &str = "Time to drink some water!";

/// A daily drink reminder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Reminder {
    pub id: String,
    pub user_id: String,
    pub message: String,
    /// "HH:MM", UTC
    pub time_of_day: String,
    pub is_active: bool,
    pub last_sent_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateReminderRequest {
    /// Defaults to "Time to drink some water!"
    #[validate(length(min = 1, max = 200, message = "Message must be between 1 and 200 characters"))]
    pub message: Option<String>,
    #[validate(custom = "validate_time_of_day")]
    pub time_of_day: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateReminderRequest {
    #[validate(length(min = 1, max = 200, message = "Message must be between 1 and 200 characters"))]
    pub message: Option<String>,
    #[validate(custom = "validate_time_of_day")]
    pub time_of_day: Option<String>,
    pub is_active: Option<bool>,
}
