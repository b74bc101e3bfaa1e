use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, Utc};

/// Storage model for a catalogued water product.
///
/// `ingredients`, `sources` and `score_breakdown` are stored as JSON text
/// and kept as raw JSON values here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaterProduct {
    pub id: i64,
    pub name: String,
    pub brand_name: Option<String>,
    pub score: f64,
    pub description: Option<String>,
    pub image: Option<String>,
    pub packaging: Option<String>,
    pub ph_level: Option<f64>,
    pub tds: Option<f64>,
    pub ingredients: Value,
    pub sources: Value,
    pub score_breakdown: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
