use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, Utc};

/// Storage model for a data-subject request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GdprRequest {
    pub id: String,
    pub user_id: String,
    pub request_type: String,
    pub data_categories: Vec<String>,
    pub reason: Option<String>,
    /// pending, processing, completed or rejected
    pub status: String,
    pub deadline: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub response_data: Option<Value>,
    pub notes: Vec<String>,
}
