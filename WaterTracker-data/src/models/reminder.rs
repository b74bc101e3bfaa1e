use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

/// A daily hydration reminder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: String,
    pub user_id: String,
    pub message: String,
    /// "HH:MM", 24-hour clock
    pub time_of_day: String,
    pub is_active: bool,
    pub last_sent_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
