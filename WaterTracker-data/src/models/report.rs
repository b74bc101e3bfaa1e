use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, NaiveDate, Utc};

/// A generated report and its rendered JSON content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: String,
    pub user_id: String,
    pub report_type: String,
    pub title: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// pending, completed or failed
    pub status: String,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}
