use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

string_enum!(
    /// What a goal measures
    GoalType {
        DailyHydration => "daily_hydration",
        WeeklyHydration => "weekly_hydration",
        MonthlyHydration => "monthly_hydration",
        MineralIntake => "mineral_intake",
        ContaminantAvoidance => "contaminant_avoidance",
        HealthScoreImprovement => "health_score_improvement",
        WeightManagement => "weight_management",
        EnergyBoost => "energy_boost",
        SkinHealth => "skin_health",
        DigestiveHealth => "digestive_health",
        Detox => "detox",
        AthleticPerformance => "athletic_performance",
    }
);

string_enum!(
    GoalStatus {
        Active => "active",
        Completed => "completed",
        Paused => "paused",
        Cancelled => "cancelled",
        Expired => "expired",
    }
);

string_enum!(
    GoalPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
);

string_enum!(
    GoalFrequency {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
);

/// Fractions of the target used when a goal is created without milestones
pub const DEFAULT_MILESTONES: [(&str, f64, i64); 5] = [
    ("First Step", 0.1, 10),
    ("Getting Serious", 0.25, 25),
    ("Halfway There", 0.5, 50),
    ("Almost Done", 0.75, 75),
    ("Goal Achieved!", 1.0, 100),
];

/// A checkpoint on the way to a goal's target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Milestone {
    pub name: String,
    pub target_value: f64,
    pub points: i64,
    #[serde(default)]
    pub achieved: bool,
    #[serde(default)]
    pub achieved_at: Option<DateTime<Utc>>,
}

impl Milestone {
    /// Default milestones scaled to a target
    pub fn defaults_for(target_value: f64) -> Vec<Milestone> {
        DEFAULT_MILESTONES
            .iter()
            .map(|(name, fraction, points)| Milestone {
                name: name.to_string(),
                target_value: target_value * fraction,
                points: *points,
                achieved: false,
                achieved_at: None,
            })
            .collect()
    }
}

/// A user's health goal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HealthGoal {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub goal_type: GoalType,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: String,
    pub frequency: GoalFrequency,
    pub priority: GoalPriority,
    /// 1 (easy) to 5 (hard)
    pub difficulty: i64,
    pub status: GoalStatus,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub motivation: Option<String>,
    pub tags: Vec<String>,
    pub milestones: Vec<Milestone>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl HealthGoal {
    /// Percentage of the target reached, capped at 100
    pub fn completion_percentage(&self) -> f64 {
        if self.target_value <= 0.0 {
            return 0.0;
        }
        (self.current_value / self.target_value * 100.0).min(100.0)
    }
}

/// Milestone supplied when creating a goal
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct MilestoneInput {
    #[validate(length(min = 1, max = 100, message = "Milestone name must be between 1 and 100 characters"))]
    pub name: String,
    pub target_value: f64,
    #[serde(default)]
    pub points: i64,
}

fn default_difficulty() -> i64 {
    3
}

/// Request payload for creating a goal
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateGoalRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub goal_type: GoalType,
    /// Must be greater than zero
    pub target_value: f64,
    #[validate(length(min = 1, max = 20, message = "Unit must be between 1 and 20 characters"))]
    pub unit: String,
    pub frequency: GoalFrequency,
    pub priority: Option<GoalPriority>,
    #[serde(default = "default_difficulty")]
    #[validate(range(min = 1, max = 5, message = "Difficulty must be between 1 and 5"))]
    pub difficulty: i64,
    /// Defaults to today
    pub start_date: Option<NaiveDate>,
    /// Must be after today
    pub target_date: NaiveDate,
    #[validate(length(max = 300, message = "Motivation cannot exceed 300 characters"))]
    pub motivation: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Default milestones are generated when omitted
    pub milestones: Option<Vec<MilestoneInput>>,
}

/// Request payload for editing a goal; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateGoalRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub target_date: Option<NaiveDate>,
    pub priority: Option<GoalPriority>,
    pub status: Option<GoalStatus>,
    #[validate(length(max = 300, message = "Motivation cannot exceed 300 characters"))]
    pub motivation: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Request payload for recording progress
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LogProgressRequest {
    /// Must be greater than zero
    pub value: f64,
    #[validate(length(max = 500, message = "Notes cannot exceed 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct GoalProgressEntry {
    pub id: String,
    pub goal_id: String,
    pub user_id: String,
    pub value: f64,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Points earned for reaching a milestone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct GoalAchievement {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub milestone_name: String,
    pub points: i64,
    pub message: String,
    pub earned_at: DateTime<Utc>,
}

/// Result of recording progress
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ProgressOutcome {
    pub goal: HealthGoal,
    pub entry: GoalProgressEntry,
    /// Milestones reached by this entry
    pub new_achievements: Vec<GoalAchievement>,
}

/// Progress history of a goal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct GoalProgressView {
    pub goal_id: String,
    pub current_value: f64,
    pub target_value: f64,
    pub completion_percentage: f64,
    /// Consecutive days with entries ending today or yesterday
    pub current_streak: i64,
    pub best_streak: i64,
    pub entries: Vec<GoalProgressEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct GoalSummary {
    pub goal: HealthGoal,
    pub completion_percentage: f64,
    pub days_remaining: i64,
    pub milestones_achieved: usize,
    pub milestones_total: usize,
}

/// Aggregates over all goals of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct GoalStats {
    pub total_goals: usize,
    pub active_goals: usize,
    pub completed_goals: usize,
    pub total_points: i64,
    pub longest_streak: i64,
    /// Completed share of goals per goal type, 0 to 1
    pub completion_rate_by_type: BTreeMap<String, f64>,
    pub recent_achievements: Vec<GoalAchievement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_milestones_scale_with_target() {
        let milestones = Milestone::defaults_for(2000.0);
        let targets: Vec<f64> = milestones.iter().map(|m| m.target_value).collect();
        assert_eq!(targets, vec![200.0, 500.0, 1000.0, 1500.0, 2000.0]);
        assert_eq!(milestones[4].name, "Goal Achieved!");
        assert_eq!(milestones.iter().map(|m| m.points).sum::<i64>(), 260);
        assert!(milestones.iter().all(|m| !m.achieved));
    }

    #[test]
    fn test_goal_type_names_round_trip_from_str() {
        for goal_type in GoalType::ALL {
            assert_eq!(goal_type.as_str().parse::<GoalType>(), Ok(*goal_type));
        }
        assert_eq!(GoalType::ALL.len(), 12);
    }
}
