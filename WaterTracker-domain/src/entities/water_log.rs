use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// A single water intake entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WaterLog {
    pub id: String,
    pub user_id: String,
    /// Catalogue product that was drunk, if any
    pub water_id: Option<i64>,
    pub volume_ml: i64,
    pub drink_type: Option<String>,
    pub caffeine_mg: Option<i64>,
    pub logged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for logging water
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateWaterLogRequest {
    pub water_id: Option<i64>,

    #[validate(range(min = 1, max = 5000, message = "Volume must be between 1 and 5000 ml"))]
    pub volume_ml: i64,

    #[validate(length(max = 50, message = "Drink type cannot exceed 50 characters"))]
    pub drink_type: Option<String>,

    #[validate(range(min = 0, max = 1000, message = "Caffeine must be between 0 and 1000 mg"))]
    pub caffeine_mg: Option<i64>,

    /// Defaults to the current time
    pub logged_at: Option<DateTime<Utc>>,
}

/// Request payload for correcting a log
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateWaterLogRequest {
    #[validate(range(min = 1, max = 5000, message = "Volume must be between 1 and 5000 ml"))]
    pub volume_ml: Option<i64>,
    pub logged_at: Option<DateTime<Utc>>,
}

/// Log search filters. Dates are inclusive calendar days in UTC.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LogSearchCriteria {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_volume: Option<i64>,
    pub max_volume: Option<i64>,
    /// Matches the brand of the logged product, case-insensitive
    #[serde(default)]
    pub brand_names: Vec<String>,
    #[serde(default)]
    pub packaging_types: Vec<String>,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

/// One page of logs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LogPage {
    pub logs: Vec<WaterLog>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Intake for one day measured against the user's goal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_volume_ml: i64,
    pub goal_ml: i64,
    pub percent_of_goal: f64,
    pub log_count: i64,
    pub goal_met: bool,
}

/// Thirty-day hydration analytics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HydrationAnalytics {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_logs: i64,
    pub total_volume_ml: i64,
    pub average_daily_volume_ml: f64,
    pub most_frequent_brand: Option<String>,
    /// Number of logs per packaging type
    pub packaging_breakdown: BTreeMap<String, i64>,
}
