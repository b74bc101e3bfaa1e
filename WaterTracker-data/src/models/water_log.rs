use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

/// Storage model for a single water intake entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaterLog {
    pub id: String,
    pub user_id: String,
    /// Catalogue product the water came from, if known
    pub water_id: Option<i64>,
    pub volume_ml: i64,
    pub drink_type: Option<String>,
    pub caffeine_mg: Option<i64>,
    pub logged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Filter for log listings. Empty vectors mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct WaterLogFilter {
    pub user_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub min_volume: Option<i64>,
    pub max_volume: Option<i64>,
    pub brand_names: Vec<String>,
    pub packaging_types: Vec<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Volume and count of logs for one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub total_volume_ml: i64,
    pub log_count: i64,
}

/// A log joined with the brand and packaging of its product
#[derive(Debug, Clone, PartialEq)]
pub struct WaterLogWithProduct {
    pub log: WaterLog,
    pub brand_name: Option<String>,
    pub packaging: Option<String>,
}
