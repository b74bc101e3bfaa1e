use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, Utc};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

string_enum!(
    /// Data subject rights under the GDPR
    GdprRequestType {
        Access => "access",
        Rectification => "rectification",
        Erasure => "erasure",
        Portability => "portability",
        Restriction => "restriction",
        Objection => "objection",
    }
);

string_enum!(
    GdprRequestStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Rejected => "rejected",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct GdprRequest {
    pub id: String,
    pub user_id: String,
    pub request_type: GdprRequestType,
    pub data_categories: Vec<String>,
    pub reason: Option<String>,
    pub status: GdprRequestStatus,
    /// Legal response deadline
    pub deadline: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub response_data: Option<Value>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateGdprRequest {
    pub request_type: GdprRequestType,
    #[serde(default)]
    pub data_categories: Vec<String>,
    #[validate(length(max = 1000, message = "Reason cannot exceed 1000 characters"))]
    pub reason: Option<String>,
}

/// Admin decision on a request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateGdprStatusRequest {
    pub status: GdprRequestStatus,
    #[validate(length(max = 1000, message = "Note cannot exceed 1000 characters"))]
    pub note: Option<String>,
}
