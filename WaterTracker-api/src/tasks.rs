//! Periodic maintenance run by the server binary

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use water_tracker_domain::services::Services;

pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// What one maintenance pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub reminders_sent: usize,
    pub goals_expired: usize,
}

/// Send due reminders and close overdue goals
pub async fn run_maintenance(services: &Services, now: DateTime<Utc>) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();

    match services.reminders.dispatch_due(now).await {
        Ok(sent) => report.reminders_sent = sent,
        Err(e) => error!("Reminder dispatch failed: {}", e),
    }
    match services.goals.expire_overdue_goals().await {
        Ok(expired) => report.goals_expired = expired,
        Err(e) => error!("Goal expiry failed: {}", e),
    }

    if report != MaintenanceReport::default() {
        info!(
            reminders_sent = report.reminders_sent,
            goals_expired = report.goals_expired,
            "Maintenance pass"
        );
    }
    report
}

/// Run maintenance on a fixed interval
pub fn start_maintenance(services: Services, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            run_maintenance(&services, Utc::now()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use water_tracker_domain::clock::Clock;
    use water_tracker_domain::entities::goal::{CreateGoalRequest, GoalFrequency, GoalStatus, GoalType};
    use water_tracker_domain::entities::reminder::CreateReminderRequest;
    use water_tracker_domain::testing::TestContext;

    #[tokio::test]
    async fn test_maintenance_sends_due_reminders() {
        let ctx = TestContext::new();
        let ana = ctx.create_user("ana").await;
        ctx.services
            .reminders
            .create_reminder(&ana.id, CreateReminderRequest { message: None, time_of_day: "12:00".to_string() })
            .await
            .unwrap();

        let report = run_maintenance(&ctx.services, ctx.clock.now()).await;
        assert_eq!(report.reminders_sent, 1);

        // Already sent today
        let again = run_maintenance(&ctx.services, ctx.clock.now()).await;
        assert_eq!(again.reminders_sent, 0);
    }

    #[tokio::test]
    async fn test_maintenance_closes_overdue_goals() {
        let ctx = TestContext::new();
        let ana = ctx.create_user("ana").await;
        let goal = ctx
            .services
            .goals
            .create_goal(
                &ana.id,
                CreateGoalRequest {
                    name: "Drink more".to_string(),
                    description: None,
                    goal_type: GoalType::WeeklyHydration,
                    target_value: 14000.0,
                    unit: "ml".to_string(),
                    frequency: GoalFrequency::Weekly,
                    priority: None,
                    difficulty: 2,
                    start_date: None,
                    target_date: NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(),
                    motivation: None,
                    tags: Vec::new(),
                    milestones: None,
                },
            )
            .await
            .unwrap();

        ctx.clock.advance(ChronoDuration::days(10));
        let report = run_maintenance(&ctx.services, ctx.clock.now()).await;
        assert_eq!(report.goals_expired, 1);

        let goals = ctx.services.goals.list_goals(&ana.id, Some(GoalStatus::Completed)).await.unwrap();
        assert_eq!(goals[0].id, goal.id);
    }
}
