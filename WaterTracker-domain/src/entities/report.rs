use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, NaiveDate, Utc};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

string_enum!(
    ReportType {
        HydrationSummary => "hydration_summary",
        GoalProgress => "goal_progress",
        Comprehensive => "comprehensive",
        GdprExport => "gdpr_export",
    }
);

string_enum!(
    ReportStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
    }
);

string_enum!(
    /// Building blocks a report layout is made of
    ReportSection {
        HydrationOverview => "hydration_overview",
        GoalAnalysis => "goal_analysis",
        Achievements => "achievements",
        Insights => "insights",
        RawData => "raw_data",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Report {
    pub id: String,
    pub user_id: String,
    pub report_type: ReportType,
    pub title: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: ReportStatus,
    /// Section name to section body
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct GenerateReportRequest {
    pub report_type: ReportType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

/// An insight produced by a matching rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Insight {
    pub id: String,
    pub title: String,
    pub message: String,
    pub metric: String,
    pub value: f64,
}
