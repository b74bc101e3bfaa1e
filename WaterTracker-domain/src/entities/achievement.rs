use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

string_enum!(
    /// Metric an achievement is staged on
    CriteriaType {
        LogCount => "log_count",
        TotalVolume => "total_volume",
    }
);

/// Thresholds for each stage of an achievement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AchievementCriteria {
    #[serde(rename = "type")]
    pub criteria_type: CriteriaType,
    /// Ascending threshold per stage
    pub values: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AchievementDefinition {
    /// Slug, e.g. `first_sip`
    pub id: String,
    pub name: String,
    pub description: String,
    pub criteria: AchievementCriteria,
    pub total_stages: usize,
}

impl AchievementDefinition {
    pub fn new(id: &str, name: &str, description: &str, criteria_type: CriteriaType, values: Vec<i64>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            total_stages: values.len(),
            criteria: AchievementCriteria { criteria_type, values },
        }
    }

    /// Threshold that must be met to move past `stage`, if any stage is left
    pub fn next_threshold(&self, stage: usize) -> Option<i64> {
        self.criteria.values.get(stage).copied()
    }
}

/// Built-in achievement catalogue
pub fn default_catalog() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition::new(
            "first_sip",
            "First Sip",
            "Log water again and again",
            CriteriaType::LogCount,
            vec![1, 10, 50, 100],
        ),
        AchievementDefinition::new(
            "hydration_hero",
            "Hydration Hero",
            "Drink a lot of water in total (ml)",
            CriteriaType::TotalVolume,
            vec![10_000, 50_000, 250_000],
        ),
    ]
}

/// Stage a user holds for an achievement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UserAchievement {
    pub id: String,
    pub user_id: String,
    pub achievement_id: String,
    pub stage: i64,
    pub earned_at: DateTime<Utc>,
}
