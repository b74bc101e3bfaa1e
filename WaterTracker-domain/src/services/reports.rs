use std::sync::Arc;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::clock::{end_of_day, start_of_day, SharedClock};
use crate::entities::conversions;
use crate::entities::goal::{GoalAchievement, GoalStatus, HealthGoal};
use crate::entities::report::{GenerateReportRequest, Insight, Report, ReportSection, ReportStatus, ReportType};
use crate::entities::user::User;
use crate::fixtures::{fill_template, vars, Fixtures, InsightRule};
use crate::services::errors::{Actor, ServiceError};
use water_tracker_data::models::water_log::WaterLogFilter;
use water_tracker_data::repository::{
    AchievementRepositoryTrait, HealthGoalRepositoryTrait, ReportRepositoryTrait, UserRepositoryTrait,
    WaterLogRepositoryTrait,
};

/// Longest period a single report may cover. Data exports are not limited.
pub const MAX_REPORT_DAYS: i64 = 366;

/// Intake for one day of a report period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayIntake {
    pub date: NaiveDate,
    pub total_volume_ml: i64,
    pub log_count: i64,
    pub goal_met: bool,
}

/// Hydration figures for a report period. Days without logs count as zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HydrationMetrics {
    pub days: i64,
    pub total_logs: i64,
    pub total_volume_ml: i64,
    pub average_daily_volume_ml: f64,
    pub daily_goal_ml: i64,
    pub days_goal_met: i64,
    /// Share of days on which the goal was met, 0 to 1
    pub goal_met_ratio: f64,
    pub current_streak: i64,
    pub daily: Vec<DayIntake>,
}

impl HydrationMetrics {
    /// Look up a metric by the name insight rules use
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "average_daily_volume_ml" => Some(self.average_daily_volume_ml),
            "goal_met_ratio" => Some(self.goal_met_ratio),
            "current_streak" => Some(self.current_streak as f64),
            "total_logs" => Some(self.total_logs as f64),
            "total_volume_ml" => Some(self.total_volume_ml as f64),
            "days_goal_met" => Some(self.days_goal_met as f64),
            _ => None,
        }
    }
}

fn format_metric(metric: &str, value: f64) -> String {
    if metric.ends_with("_ratio") {
        format!("{:.0}%", value * 100.0)
    } else {
        format!("{:.0}", value)
    }
}

/// Apply every rule whose metric exists and whose condition holds
pub fn evaluate_insights(rules: &[InsightRule], metrics: &HydrationMetrics) -> Vec<Insight> {
    rules
        .iter()
        .filter_map(|rule| {
            let Some(value) = metrics.metric(&rule.metric) else {
                warn!("Insight rule {} uses unknown metric {}", rule.id, rule.metric);
                return None;
            };
            rule.matches(value).then(|| Insight {
                id: rule.id.clone(),
                title: rule.title.clone(),
                message: fill_template(&rule.message, &vars([("value", format_metric(&rule.metric, value))])),
                metric: rule.metric.clone(),
                value,
            })
        })
        .collect()
}

/// Trait for generated reports
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportServiceTrait {
    /// Build every section the report type's layout names and store the result
    async fn generate_report(&self, user_id: &str, request: GenerateReportRequest) -> Result<Report, ServiceError>;

    async fn get_report(&self, actor: &Actor, id: &str) -> Result<Report, ServiceError>;

    async fn list_reports(&self, user_id: &str) -> Result<Vec<Report>, ServiceError>;

    async fn delete_report(&self, actor: &Actor, id: &str) -> Result<(), ServiceError>;
}

/// Report service for domain logic
pub struct ReportService<R: ReportRepositoryTrait> {
    repository: R,
    users: Arc<dyn UserRepositoryTrait + Send + Sync>,
    logs: Arc<dyn WaterLogRepositoryTrait + Send + Sync>,
    goals: Arc<dyn HealthGoalRepositoryTrait + Send + Sync>,
    achievements: Arc<dyn AchievementRepositoryTrait + Send + Sync>,
    fixtures: Arc<Fixtures>,
    clock: SharedClock,
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::corrupt(e.to_string()))
}

impl<R: ReportRepositoryTrait> ReportService<R> {
    pub fn new(
        repository: R,
        users: Arc<dyn UserRepositoryTrait + Send + Sync>,
        logs: Arc<dyn WaterLogRepositoryTrait + Send + Sync>,
        goals: Arc<dyn HealthGoalRepositoryTrait + Send + Sync>,
        achievements: Arc<dyn AchievementRepositoryTrait + Send + Sync>,
        fixtures: Arc<Fixtures>,
        clock: SharedClock,
    ) -> Self {
        Self { repository, users, logs, goals, achievements, fixtures, clock }
    }

    async fn load_owned(&self, actor: &Actor, id: &str) -> Result<Report, ServiceError> {
        let stored = self.repository.get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Report", id))?;
        actor.ensure_can_access(&stored.user_id)?;
        conversions::convert_to_domain_report(stored).map_err(ServiceError::corrupt)
    }

    async fn hydration_metrics(&self, user: &User, start: NaiveDate, end: NaiveDate) -> Result<HydrationMetrics, ServiceError> {
        let volumes = self.logs
            .daily_volumes(&user.id, start_of_day(start), start_of_day(end + Duration::days(1)))
            .await?;

        let days = (end - start).num_days() + 1;
        let daily: Vec<DayIntake> = volumes
            .into_iter()
            .map(|d| DayIntake {
                date: d.date,
                total_volume_ml: d.total_volume_ml,
                log_count: d.log_count,
                goal_met: d.total_volume_ml >= user.daily_goal_ml,
            })
            .collect();

        let total_volume_ml: i64 = daily.iter().map(|d| d.total_volume_ml).sum();
        let days_goal_met = daily.iter().filter(|d| d.goal_met).count() as i64;

        Ok(HydrationMetrics {
            days,
            total_logs: daily.iter().map(|d| d.log_count).sum(),
            total_volume_ml,
            average_daily_volume_ml: total_volume_ml as f64 / days as f64,
            daily_goal_ml: user.daily_goal_ml,
            days_goal_met,
            goal_met_ratio: days_goal_met as f64 / days as f64,
            current_streak: user.current_streak,
            daily,
        })
    }

    async fn user_goals(&self, user_id: &str) -> Result<Vec<HealthGoal>, ServiceError> {
        self.goals.list_for_user(user_id, None)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_goal)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)
    }

    async fn goal_analysis(&self, user_id: &str) -> Result<Value, ServiceError> {
        let goals = self.user_goals(user_id).await?;
        let summaries: Vec<Value> = goals
            .iter()
            .map(|g| {
                json!({
                    "id": g.id,
                    "name": g.name,
                    "goal_type": g.goal_type,
                    "status": g.status,
                    "current_value": g.current_value,
                    "target_value": g.target_value,
                    "completion_percentage": g.completion_percentage(),
                    "target_date": g.target_date,
                })
            })
            .collect();

        Ok(json!({
            "total_goals": goals.len(),
            "active_goals": goals.iter().filter(|g| g.status == GoalStatus::Active).count(),
            "completed_goals": goals.iter().filter(|g| g.status == GoalStatus::Completed).count(),
            "goals": summaries,
        }))
    }

    async fn achievements_section(&self, user_id: &str) -> Result<Value, ServiceError> {
        let staged: Vec<_> = self.achievements.list_for_user(user_id)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_user_achievement)
            .collect();
        let milestones: Vec<GoalAchievement> = self.goals.achievements_for_user(user_id)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_goal_achievement)
            .collect();

        Ok(json!({
            "achievements": to_json(&staged)?,
            "goal_milestones": to_json(&milestones)?,
            "milestone_points": milestones.iter().map(|m| m.points).sum::<i64>(),
        }))
    }

    async fn raw_data(&self, user: &User, start: NaiveDate, end: NaiveDate) -> Result<Value, ServiceError> {
        let filter = WaterLogFilter {
            user_id: Some(user.id.clone()),
            start: Some(start_of_day(start)),
            end: Some(end_of_day(end)),
            ..Default::default()
        };
        let (logs, _) = self.logs.find(&filter).await?;
        let logs: Vec<_> = logs.into_iter().map(conversions::convert_to_domain_log).collect();
        let goals = self.user_goals(&user.id).await?;

        Ok(json!({
            "user": to_json(user)?,
            "water_logs": to_json(&logs)?,
            "health_goals": to_json(&goals)?,
        }))
    }
}

#[async_trait]
impl<R: ReportRepositoryTrait + Send + Sync> ReportServiceTrait for ReportService<R> {
    async fn generate_report(&self, user_id: &str, request: GenerateReportRequest) -> Result<Report, ServiceError> {
        let (start, end) = (request.period_start, request.period_end);
        if end < start {
            return Err(ServiceError::ValidationError("period_end must not be before period_start".to_string()));
        }
        if request.report_type != ReportType::GdprExport && (end - start).num_days() >= MAX_REPORT_DAYS {
            return Err(ServiceError::ValidationError(format!(
                "A report may cover at most {} days",
                MAX_REPORT_DAYS
            )));
        }

        let template = self.fixtures
            .report_template(request.report_type)
            .ok_or_else(|| ServiceError::NotFound(format!("No layout for report type {}", request.report_type)))?;
        let stored_user = self.users.get_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;
        let user = conversions::convert_to_domain_user(stored_user).map_err(ServiceError::corrupt)?;

        let mut metrics: Option<HydrationMetrics> = None;
        let mut content = Map::new();
        for section in &template.sections {
            let body = match section {
                ReportSection::HydrationOverview | ReportSection::Insights => {
                    if metrics.is_none() {
                        metrics = Some(self.hydration_metrics(&user, start, end).await?);
                    }
                    let Some(metrics) = metrics.as_ref() else {
                        continue;
                    };
                    if *section == ReportSection::HydrationOverview {
                        to_json(metrics)?
                    } else {
                        to_json(&evaluate_insights(&self.fixtures.insights, metrics))?
                    }
                },
                ReportSection::GoalAnalysis => self.goal_analysis(user_id).await?,
                ReportSection::Achievements => self.achievements_section(user_id).await?,
                ReportSection::RawData => self.raw_data(&user, start, end).await?,
            };
            content.insert(section.as_str().to_string(), body);
        }
        debug!("Built {} sections for {} report", content.len(), request.report_type);

        let report = Report {
            id: conversions::new_id(),
            user_id: user_id.to_string(),
            report_type: request.report_type,
            title: template.title.clone(),
            period_start: start,
            period_end: end,
            status: ReportStatus::Completed,
            content: Value::Object(content),
            created_at: self.clock.now(),
        };
        let stored = self.repository.create(conversions::convert_to_data_report(&report)).await?;
        info!("Generated {} report {} for user {}", report.report_type, report.id, user_id);
        conversions::convert_to_domain_report(stored).map_err(ServiceError::corrupt)
    }

    async fn get_report(&self, actor: &Actor, id: &str) -> Result<Report, ServiceError> {
        self.load_owned(actor, id).await
    }

    async fn list_reports(&self, user_id: &str) -> Result<Vec<Report>, ServiceError> {
        self.repository.list_for_user(user_id)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_report)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)
    }

    async fn delete_report(&self, actor: &Actor, id: &str) -> Result<(), ServiceError> {
        self.load_owned(actor, id).await?;
        if !self.repository.delete(id).await? {
            return Err(ServiceError::not_found("Report", id));
        }
        info!("Deleted report {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::entities::water_log::CreateWaterLogRequest;
    use crate::testing::TestContext;

    fn metrics(average: f64, ratio: f64, streak: i64, logs: i64) -> HydrationMetrics {
        HydrationMetrics {
            days: 10,
            total_logs: logs,
            total_volume_ml: (average * 10.0) as i64,
            average_daily_volume_ml: average,
            daily_goal_ml: 2000,
            days_goal_met: (ratio * 10.0) as i64,
            goal_met_ratio: ratio,
            current_streak: streak,
            daily: vec![],
        }
    }

    fn ids(insights: &[Insight]) -> Vec<&str> {
        insights.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_insight_rules() {
        let rules = Fixtures::embedded().unwrap().insights;

        let struggling = evaluate_insights(&rules, &metrics(900.0, 0.2, 1, 2));
        assert_eq!(ids(&struggling), vec!["low_average_intake", "goal_rarely_met", "few_logs"]);
        assert_eq!(
            struggling[0].message,
            "You averaged 900 ml per day. Try adding a glass in the morning and one after lunch."
        );
        assert_eq!(struggling[1].message, "You met your daily goal on 20% of the days. Setting reminders can help.");

        let thriving = evaluate_insights(&rules, &metrics(2600.0, 0.9, 12, 40));
        assert_eq!(ids(&thriving), vec!["great_average_intake", "goal_consistently_met", "strong_streak"]);

        let middling = evaluate_insights(&rules, &metrics(2000.0, 0.6, 3, 20));
        assert!(middling.is_empty());
    }

    #[tokio::test]
    async fn test_hydration_summary_report() {
        let ctx = TestContext::at(Utc.with_ymd_and_hms(2024, 8, 5, 12, 0, 0).unwrap());
        let user = ctx.create_user("reporter").await;
        for (day, volume_ml) in [(1, 2500), (2, 1000), (3, 2000)] {
            let req = CreateWaterLogRequest {
                water_id: None,
                volume_ml,
                drink_type: None,
                caffeine_mg: None,
                logged_at: Some(Utc.with_ymd_and_hms(2024, 8, day, 9, 0, 0).unwrap()),
            };
            ctx.services.water_logs.log_water(&user.id, req).await.unwrap();
        }

        let request = GenerateReportRequest {
            report_type: ReportType::HydrationSummary,
            period_start: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 8, 4).unwrap(),
        };
        let report = ctx.services.reports.generate_report(&user.id, request).await.unwrap();
        assert_eq!(report.title, "Hydration Summary");
        assert_eq!(report.status, ReportStatus::Completed);

        let overview = &report.content["hydration_overview"];
        assert_eq!(overview["days"], 4);
        assert_eq!(overview["total_volume_ml"], 5500);
        assert_eq!(overview["days_goal_met"], 2);
        assert_eq!(overview["goal_met_ratio"], 0.5);
        assert!(report.content.get("goal_analysis").is_none());

        let insights: Vec<Insight> = serde_json::from_value(report.content["insights"].clone()).unwrap();
        assert_eq!(ids(&insights), vec!["low_average_intake", "few_logs"]);

        let listed = ctx.services.reports.list_reports(&user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], report);
    }

    #[tokio::test]
    async fn test_report_validation_and_ownership() {
        let ctx = TestContext::new();
        let user = ctx.create_user("careful").await;
        let today = ctx.today();

        let backwards = GenerateReportRequest {
            report_type: ReportType::Comprehensive,
            period_start: today,
            period_end: today - Duration::days(1),
        };
        assert!(matches!(
            ctx.services.reports.generate_report(&user.id, backwards).await.unwrap_err(),
            ServiceError::ValidationError(_)
        ));

        let request = GenerateReportRequest { report_type: ReportType::Comprehensive, period_start: today, period_end: today };
        let report = ctx.services.reports.generate_report(&user.id, request).await.unwrap();
        let sections: Vec<&String> = report.content.as_object().unwrap().keys().collect();
        assert_eq!(sections.len(), 4);

        let stranger = Actor::user("stranger");
        assert!(matches!(
            ctx.services.reports.get_report(&stranger, &report.id).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert!(ctx.services.reports.get_report(&Actor::admin("root"), &report.id).await.is_ok());

        ctx.services.reports.delete_report(&Actor::user(&user.id), &report.id).await.unwrap();
        assert!(ctx.services.reports.list_reports(&user.id).await.unwrap().is_empty());
    }
}
