use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::entities::conversions;
use crate::entities::goal::{
    CreateGoalRequest, GoalAchievement, GoalPriority, GoalProgressEntry, GoalProgressView, GoalStats, GoalStatus,
    GoalSummary, GoalType, HealthGoal, LogProgressRequest, Milestone, ProgressOutcome, UpdateGoalRequest,
};
use crate::fixtures::vars;
use crate::services::errors::{validate_request, Actor, ServiceError};
use crate::services::locks::KeyedLocks;
use crate::services::notifications::NotificationServiceTrait;
use water_tracker_data::repository::HealthGoalRepositoryTrait;

/// Achievements included in the stats view
pub const RECENT_ACHIEVEMENTS: usize = 5;

/// Trait for health goals and their progress
#[async_trait]
pub trait GoalServiceTrait {
    async fn create_goal(&self, user_id: &str, request: CreateGoalRequest) -> Result<HealthGoal, ServiceError>;

    async fn get_goal(&self, actor: &Actor, id: &str) -> Result<HealthGoal, ServiceError>;

    async fn list_goals(&self, user_id: &str, status: Option<GoalStatus>) -> Result<Vec<HealthGoal>, ServiceError>;

    async fn update_goal(&self, actor: &Actor, id: &str, request: UpdateGoalRequest) -> Result<HealthGoal, ServiceError>;

    async fn delete_goal(&self, actor: &Actor, id: &str) -> Result<(), ServiceError>;

    /// Record progress, award reached milestones and complete the goal at its target
    async fn log_progress(
        &self,
        actor: &Actor,
        goal_id: &str,
        request: LogProgressRequest,
    ) -> Result<ProgressOutcome, ServiceError>;

    async fn progress_view(&self, actor: &Actor, goal_id: &str) -> Result<GoalProgressView, ServiceError>;

    async fn goal_summary(&self, actor: &Actor, goal_id: &str) -> Result<GoalSummary, ServiceError>;

    async fn goal_stats(&self, user_id: &str) -> Result<GoalStats, ServiceError>;

    /// Close active goals whose target date has passed; returns how many were closed
    async fn expire_overdue_goals(&self) -> Result<usize, ServiceError>;
}

/// Current and best run of consecutive days.
///
/// `days` must be sorted ascending. The current run only counts when it
/// ends today or yesterday.
pub fn day_streaks(days: &[NaiveDate], today: NaiveDate) -> (i64, i64) {
    let mut unique = days.to_vec();
    unique.dedup();

    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in &unique {
        run = match previous {
            Some(prev) if *day - prev == chrono::Duration::days(1) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(*day);
    }

    let current = match previous {
        Some(last) if (today - last).num_days() <= 1 && last <= today => run,
        _ => 0,
    };
    (current, best)
}

/// Health goal service for domain logic
pub struct GoalService<R: HealthGoalRepositoryTrait> {
    repository: R,
    notifications: Arc<dyn NotificationServiceTrait + Send + Sync>,
    clock: SharedClock,
    goal_locks: KeyedLocks,
}

impl<R: HealthGoalRepositoryTrait> GoalService<R> {
    pub fn new(repository: R, notifications: Arc<dyn NotificationServiceTrait + Send + Sync>, clock: SharedClock) -> Self {
        Self { repository, notifications, clock, goal_locks: KeyedLocks::new() }
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    async fn load_owned(&self, actor: &Actor, id: &str) -> Result<HealthGoal, ServiceError> {
        let stored = self.repository.get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Health goal", id))?;
        actor.ensure_can_access(&stored.user_id)?;
        conversions::convert_to_domain_goal(stored).map_err(ServiceError::corrupt)
    }

    async fn store(&self, goal: &HealthGoal) -> Result<HealthGoal, ServiceError> {
        let data = conversions::convert_to_data_goal(goal).map_err(ServiceError::corrupt)?;
        let stored = self.repository.update(&data).await?;
        conversions::convert_to_domain_goal(stored).map_err(ServiceError::corrupt)
    }

    async fn entries(&self, goal_id: &str) -> Result<Vec<GoalProgressEntry>, ServiceError> {
        Ok(self.repository.progress_for_goal(goal_id)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_progress)
            .collect())
    }

    async fn streaks_for(&self, goal_id: &str) -> Result<(i64, i64, Vec<GoalProgressEntry>), ServiceError> {
        let entries = self.entries(goal_id).await?;
        let days: Vec<NaiveDate> = entries.iter().map(|e| e.recorded_at.date_naive()).collect();
        let (current, best) = day_streaks(&days, self.today());
        Ok((current, best, entries))
    }
}

#[async_trait]
impl<R: HealthGoalRepositoryTrait + Send + Sync> GoalServiceTrait for GoalService<R> {
    async fn create_goal(&self, user_id: &str, request: CreateGoalRequest) -> Result<HealthGoal, ServiceError> {
        validate_request(&request)?;
        if request.target_value <= 0.0 {
            return Err(ServiceError::ValidationError("Target value must be greater than zero".to_string()));
        }

        let now = self.clock.now();
        let today = now.date_naive();
        if request.target_date <= today {
            warn!("Rejected goal with target date {} for user {}", request.target_date, user_id);
            return Err(ServiceError::ValidationError("Target date must be in the future".to_string()));
        }

        let mut milestones = match request.milestones {
            Some(inputs) if !inputs.is_empty() => {
                for input in &inputs {
                    validate_request(input)?;
                    if input.target_value <= 0.0 {
                        return Err(ServiceError::ValidationError(
                            "Milestone target values must be greater than zero".to_string(),
                        ));
                    }
                }
                inputs
                    .into_iter()
                    .map(|m| Milestone {
                        name: m.name,
                        target_value: m.target_value,
                        points: m.points,
                        achieved: false,
                        achieved_at: None,
                    })
                    .collect()
            },
            _ => Milestone::defaults_for(request.target_value),
        };
        milestones.sort_by(|a, b| a.target_value.total_cmp(&b.target_value));

        let goal = HealthGoal {
            id: conversions::new_id(),
            user_id: user_id.to_string(),
            name: request.name,
            description: request.description,
            goal_type: request.goal_type,
            target_value: request.target_value,
            current_value: 0.0,
            unit: request.unit,
            frequency: request.frequency,
            priority: request.priority.unwrap_or(GoalPriority::Medium),
            difficulty: request.difficulty,
            status: GoalStatus::Active,
            start_date: request.start_date.unwrap_or(today),
            target_date: request.target_date,
            motivation: request.motivation,
            tags: request.tags,
            milestones,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let data = conversions::convert_to_data_goal(&goal).map_err(ServiceError::corrupt)?;
        let stored = self.repository.create(data).await?;
        info!("Created goal {} for user {}", goal.id, user_id);
        conversions::convert_to_domain_goal(stored).map_err(ServiceError::corrupt)
    }

    async fn get_goal(&self, actor: &Actor, id: &str) -> Result<HealthGoal, ServiceError> {
        self.load_owned(actor, id).await
    }

    async fn list_goals(&self, user_id: &str, status: Option<GoalStatus>) -> Result<Vec<HealthGoal>, ServiceError> {
        let goals = self.repository
            .list_for_user(user_id, status.map(|s| s.as_str()))
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_goal)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)?;
        debug!("Listed {} goals for {}", goals.len(), user_id);
        Ok(goals)
    }

    async fn update_goal(&self, actor: &Actor, id: &str, request: UpdateGoalRequest) -> Result<HealthGoal, ServiceError> {
        validate_request(&request)?;
        let mut goal = self.load_owned(actor, id).await?;
        let now = self.clock.now();

        if let Some(name) = request.name {
            goal.name = name;
        }
        if let Some(description) = request.description {
            goal.description = Some(description);
        }
        if let Some(target_value) = request.target_value {
            if target_value <= 0.0 {
                return Err(ServiceError::ValidationError("Target value must be greater than zero".to_string()));
            }
            goal.target_value = target_value;
        }
        if let Some(target_date) = request.target_date {
            goal.target_date = target_date;
        }
        if let Some(priority) = request.priority {
            goal.priority = priority;
        }
        if let Some(status) = request.status {
            goal.completed_at = match status {
                GoalStatus::Completed => goal.completed_at.or(Some(now)),
                _ => None,
            };
            goal.status = status;
        }
        if let Some(motivation) = request.motivation {
            goal.motivation = Some(motivation);
        }
        if let Some(tags) = request.tags {
            goal.tags = tags;
        }
        goal.updated_at = now;

        let goal = self.store(&goal).await?;
        info!("Updated goal {}", id);
        Ok(goal)
    }

    async fn delete_goal(&self, actor: &Actor, id: &str) -> Result<(), ServiceError> {
        self.load_owned(actor, id).await?;
        if !self.repository.soft_delete(id, self.clock.now()).await? {
            return Err(ServiceError::not_found("Health goal", id));
        }
        info!("Deleted goal {}", id);
        Ok(())
    }

    async fn log_progress(
        &self,
        actor: &Actor,
        goal_id: &str,
        request: LogProgressRequest,
    ) -> Result<ProgressOutcome, ServiceError> {
        validate_request(&request)?;
        if request.value <= 0.0 {
            return Err(ServiceError::ValidationError("Progress value must be greater than zero".to_string()));
        }

        // Progress is read then written back; one request per goal at a time
        let _guard = self.goal_locks.lock(goal_id).await;
        let mut goal = self.load_owned(actor, goal_id).await?;
        if goal.status != GoalStatus::Active {
            return Err(ServiceError::ValidationError(format!(
                "Progress can only be logged on active goals; this goal is {}",
                goal.status
            )));
        }

        let now = self.clock.now();
        let entry = GoalProgressEntry {
            id: conversions::new_id(),
            goal_id: goal.id.clone(),
            user_id: goal.user_id.clone(),
            value: request.value,
            notes: request.notes,
            recorded_at: now,
        };

        goal.current_value = if goal.goal_type == GoalType::DailyHydration {
            let today = now.date_naive();
            let logged_today: f64 = self.entries(&goal.id)
                .await?
                .iter()
                .filter(|e| e.recorded_at.date_naive() == today)
                .map(|e| e.value)
                .sum();
            logged_today + entry.value
        } else {
            goal.current_value + entry.value
        };

        // Everything that can fail without touching storage happens first
        let mut reached = Vec::new();
        let mut pending_notifications = Vec::new();
        for index in 0..goal.milestones.len() {
            let milestone = &goal.milestones[index];
            if milestone.achieved || goal.current_value < milestone.target_value {
                continue;
            }

            let notification = self.notifications
                .render_template(
                    "goal_milestone",
                    &goal.user_id,
                    &vars([("milestone", milestone.name.clone()), ("goal", goal.name.clone())]),
                )?
                .with_related("health_goal", &goal.id)
                .with_payload(serde_json::json!({
                    "milestone": milestone.name,
                    "points": milestone.points,
                }));

            reached.push(GoalAchievement {
                id: conversions::new_id(),
                user_id: goal.user_id.clone(),
                goal_id: goal.id.clone(),
                milestone_name: milestone.name.clone(),
                points: milestone.points,
                message: notification.message.clone(),
                earned_at: now,
            });
            pending_notifications.push(notification);

            let milestone = &mut goal.milestones[index];
            milestone.achieved = true;
            milestone.achieved_at = Some(now);
        }

        if goal.current_value >= goal.target_value {
            goal.status = GoalStatus::Completed;
            goal.completed_at = Some(now);
            pending_notifications.push(
                self.notifications
                    .render_template("goal_completed", &goal.user_id, &vars([("goal", goal.name.clone())]))?
                    .with_related("health_goal", &goal.id),
            );
        }
        goal.updated_at = now;

        let entry = conversions::convert_to_domain_progress(
            self.repository.add_progress(conversions::convert_to_data_progress(&entry)).await?,
        );
        let mut new_achievements = Vec::with_capacity(reached.len());
        for achievement in &reached {
            let stored = self.repository
                .add_achievement(conversions::convert_to_data_goal_achievement(achievement))
                .await?;
            info!("Goal {} reached milestone '{}'", goal.id, achievement.milestone_name);
            new_achievements.push(conversions::convert_to_domain_goal_achievement(stored));
        }
        let goal = self.store(&goal).await?;
        if goal.status == GoalStatus::Completed {
            info!("Goal {} completed", goal.id);
        }

        // Progress is already stored; delivery failures are only logged
        for notification in pending_notifications {
            if let Err(e) = self.notifications.create_notification(notification).await {
                warn!("Failed to notify {} about goal {}: {}", goal.user_id, goal.id, e);
            }
        }

        Ok(ProgressOutcome { goal, entry, new_achievements })
    }

    async fn progress_view(&self, actor: &Actor, goal_id: &str) -> Result<GoalProgressView, ServiceError> {
        let goal = self.load_owned(actor, goal_id).await?;
        let (current_streak, best_streak, entries) = self.streaks_for(&goal.id).await?;

        Ok(GoalProgressView {
            goal_id: goal.id.clone(),
            current_value: goal.current_value,
            target_value: goal.target_value,
            completion_percentage: goal.completion_percentage(),
            current_streak,
            best_streak,
            entries,
        })
    }

    async fn goal_summary(&self, actor: &Actor, goal_id: &str) -> Result<GoalSummary, ServiceError> {
        let goal = self.load_owned(actor, goal_id).await?;
        let days_remaining = (goal.target_date - self.today()).num_days().max(0);

        Ok(GoalSummary {
            completion_percentage: goal.completion_percentage(),
            days_remaining,
            milestones_achieved: goal.milestones.iter().filter(|m| m.achieved).count(),
            milestones_total: goal.milestones.len(),
            goal,
        })
    }

    async fn goal_stats(&self, user_id: &str) -> Result<GoalStats, ServiceError> {
        let goals = self.list_goals(user_id, None).await?;

        let mut longest_streak = 0;
        let mut per_type: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for goal in &goals {
            let (_, best, _) = self.streaks_for(&goal.id).await?;
            longest_streak = longest_streak.max(best);

            let counts = per_type.entry(goal.goal_type.to_string()).or_default();
            counts.0 += 1;
            if goal.status == GoalStatus::Completed {
                counts.1 += 1;
            }
        }

        let achievements: Vec<GoalAchievement> = self.repository
            .achievements_for_user(user_id)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_goal_achievement)
            .collect();

        Ok(GoalStats {
            total_goals: goals.len(),
            active_goals: goals.iter().filter(|g| g.status == GoalStatus::Active).count(),
            completed_goals: goals.iter().filter(|g| g.status == GoalStatus::Completed).count(),
            total_points: achievements.iter().map(|a| a.points).sum(),
            longest_streak,
            completion_rate_by_type: per_type
                .into_iter()
                .map(|(goal_type, (total, completed))| (goal_type, completed as f64 / total as f64))
                .collect(),
            recent_achievements: achievements.into_iter().take(RECENT_ACHIEVEMENTS).collect(),
        })
    }

    async fn expire_overdue_goals(&self) -> Result<usize, ServiceError> {
        let now = self.clock.now();
        let overdue = self.repository.list_overdue(now.date_naive()).await?;

        let mut closed = 0;
        for stored in overdue {
            let mut goal = conversions::convert_to_domain_goal(stored).map_err(ServiceError::corrupt)?;
            goal.status = GoalStatus::Completed;
            goal.completed_at = Some(now);
            goal.updated_at = now;
            self.store(&goal).await?;
            closed += 1;
        }
        if closed > 0 {
            info!("Closed {} overdue goals", closed);
        }
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use crate::entities::goal::{GoalFrequency, MilestoneInput};
    use crate::entities::notification::NotificationType;
    use crate::services::notifications::MockNotificationServiceTrait;
    use crate::testing::TestContext;
    use water_tracker_data::repository::HealthGoalRepository;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(goal_type: GoalType, target_value: f64, target_date: NaiveDate) -> CreateGoalRequest {
        CreateGoalRequest {
            name: "Drink more".to_string(),
            description: None,
            goal_type,
            target_value,
            unit: "ml".to_string(),
            frequency: GoalFrequency::Daily,
            priority: None,
            difficulty: 3,
            start_date: None,
            target_date,
            motivation: None,
            tags: vec![],
            milestones: None,
        }
    }

    fn progress(value: f64) -> LogProgressRequest {
        LogProgressRequest { value, notes: None }
    }

    #[test]
    fn test_day_streaks() {
        let today = date(2024, 5, 10);
        let days = [date(2024, 5, 1), date(2024, 5, 2), date(2024, 5, 3), date(2024, 5, 9), date(2024, 5, 10)];
        assert_eq!(day_streaks(&days, today), (2, 3));

        let stale = [date(2024, 5, 1), date(2024, 5, 2)];
        assert_eq!(day_streaks(&stale, today), (0, 2));

        let repeated = [date(2024, 5, 9), date(2024, 5, 9), date(2024, 5, 9)];
        assert_eq!(day_streaks(&repeated, today), (1, 1));

        assert_eq!(day_streaks(&[], today), (0, 0));
    }

    #[tokio::test]
    async fn test_create_goal_rules() {
        let ctx = TestContext::at(Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap());
        let user = ctx.create_user("goalie").await;

        let goal = ctx.services.goals
            .create_goal(&user.id, request(GoalType::WeeklyHydration, 1000.0, date(2024, 6, 1)))
            .await
            .unwrap();
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.priority, GoalPriority::Medium);
        assert_eq!(goal.start_date, date(2024, 5, 10));
        assert_eq!(goal.milestones.len(), 5);
        assert_eq!(goal.milestones[0].target_value, 100.0);

        let past = ctx.services.goals
            .create_goal(&user.id, request(GoalType::Detox, 10.0, date(2024, 5, 10)))
            .await
            .unwrap_err();
        assert!(matches!(past, ServiceError::ValidationError(_)));

        let zero = ctx.services.goals
            .create_goal(&user.id, request(GoalType::Detox, 0.0, date(2024, 6, 1)))
            .await
            .unwrap_err();
        assert!(matches!(zero, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_custom_milestones_are_sorted() {
        let ctx = TestContext::new();
        let user = ctx.create_user("custom").await;
        let mut req = request(GoalType::MineralIntake, 100.0, ctx.today() + Duration::days(30));
        req.milestones = Some(vec![
            MilestoneInput { name: "Most".to_string(), target_value: 80.0, points: 20 },
            MilestoneInput { name: "Some".to_string(), target_value: 20.0, points: 5 },
        ]);

        let goal = ctx.services.goals.create_goal(&user.id, req).await.unwrap();
        let names: Vec<_> = goal.milestones.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Some", "Most"]);
    }

    #[tokio::test]
    async fn test_progress_reaches_milestones_and_completes() {
        let ctx = TestContext::new();
        let user = ctx.create_user("achiever").await;
        let actor = Actor::user(&user.id);
        let goal = ctx.services.goals
            .create_goal(&user.id, request(GoalType::WeeklyHydration, 1000.0, ctx.today() + Duration::days(7)))
            .await
            .unwrap();

        let outcome = ctx.services.goals.log_progress(&actor, &goal.id, progress(300.0)).await.unwrap();
        assert_eq!(outcome.goal.current_value, 300.0);
        let reached: Vec<_> = outcome.new_achievements.iter().map(|a| a.milestone_name.as_str()).collect();
        assert_eq!(reached, vec!["First Step", "Getting Serious"]);
        assert_eq!(
            outcome.new_achievements[0].message,
            "You've reached the 'First Step' milestone for your goal: 'Drink more'!"
        );

        let outcome = ctx.services.goals.log_progress(&actor, &goal.id, progress(700.0)).await.unwrap();
        assert_eq!(outcome.new_achievements.len(), 3);
        assert_eq!(outcome.goal.status, GoalStatus::Completed);
        assert!(outcome.goal.completed_at.is_some());

        let err = ctx.services.goals.log_progress(&actor, &goal.id, progress(10.0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));

        let inbox = ctx.services.notifications.list_notifications(&user.id, None, 0, 20).await.unwrap();
        assert_eq!(inbox.total, 6);
        assert!(inbox.notifications.iter().all(|n| n.notification_type == NotificationType::GoalMilestone));
        assert!(inbox.notifications.iter().all(|n| n.related_entity_id.as_deref() == Some(goal.id.as_str())));
    }

    #[tokio::test]
    async fn test_daily_hydration_sums_today_only() {
        let ctx = TestContext::at(Utc.with_ymd_and_hms(2024, 5, 10, 20, 0, 0).unwrap());
        let user = ctx.create_user("daily").await;
        let actor = Actor::user(&user.id);
        let goal = ctx.services.goals
            .create_goal(&user.id, request(GoalType::DailyHydration, 5000.0, date(2024, 6, 1)))
            .await
            .unwrap();

        ctx.services.goals.log_progress(&actor, &goal.id, progress(400.0)).await.unwrap();
        ctx.services.goals.log_progress(&actor, &goal.id, progress(600.0)).await.unwrap();
        ctx.clock.advance(Duration::hours(6));
        let outcome = ctx.services.goals.log_progress(&actor, &goal.id, progress(250.0)).await.unwrap();
        assert_eq!(outcome.goal.current_value, 250.0);

        let view = ctx.services.goals.progress_view(&actor, &goal.id).await.unwrap();
        assert_eq!(view.entries.len(), 3);
        assert_eq!(view.current_streak, 2);
        assert_eq!(view.best_streak, 2);
        assert!((view.completion_percentage - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_summary_stats_and_expiry() {
        let ctx = TestContext::at(Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap());
        let user = ctx.create_user("planner").await;
        let actor = Actor::user(&user.id);

        let short = ctx.services.goals
            .create_goal(&user.id, request(GoalType::Detox, 10.0, date(2024, 5, 12)))
            .await
            .unwrap();
        let long = ctx.services.goals
            .create_goal(&user.id, request(GoalType::Detox, 10.0, date(2024, 6, 9)))
            .await
            .unwrap();
        ctx.services.goals.log_progress(&actor, &long.id, progress(10.0)).await.unwrap();

        let summary = ctx.services.goals.goal_summary(&actor, &short.id).await.unwrap();
        assert_eq!(summary.days_remaining, 2);
        assert_eq!(summary.milestones_total, 5);
        assert_eq!(summary.milestones_achieved, 0);

        let stats = ctx.services.goals.goal_stats(&user.id).await.unwrap();
        assert_eq!(stats.total_goals, 2);
        assert_eq!(stats.completed_goals, 1);
        assert_eq!(stats.total_points, 260);
        assert_eq!(stats.completion_rate_by_type.get("detox"), Some(&0.5));
        assert_eq!(stats.recent_achievements.len(), RECENT_ACHIEVEMENTS);

        ctx.clock.advance(Duration::days(3));
        assert_eq!(ctx.services.goals.expire_overdue_goals().await.unwrap(), 1);
        let expired = ctx.services.goals.get_goal(&actor, &short.id).await.unwrap();
        assert_eq!(expired.status, GoalStatus::Completed);
        assert_eq!(ctx.services.goals.expire_overdue_goals().await.unwrap(), 0);

        let summary = ctx.services.goals.goal_summary(&actor, &short.id).await.unwrap();
        assert_eq!(summary.days_remaining, 0);
    }

    #[tokio::test]
    async fn test_update_and_delete_require_owner() {
        let ctx = TestContext::new();
        let user = ctx.create_user("owner").await;
        let actor = Actor::user(&user.id);
        let goal = ctx.services.goals
            .create_goal(&user.id, request(GoalType::EnergyBoost, 5.0, ctx.today() + Duration::days(3)))
            .await
            .unwrap();

        let stranger = Actor::user("someone-else");
        assert!(matches!(
            ctx.services.goals.update_goal(&stranger, &goal.id, UpdateGoalRequest::default()).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));

        let paused = ctx.services.goals
            .update_goal(&actor, &goal.id, UpdateGoalRequest { status: Some(GoalStatus::Paused), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(paused.status, GoalStatus::Paused);
        assert_eq!(ctx.services.goals.list_goals(&user.id, Some(GoalStatus::Paused)).await.unwrap().len(), 1);

        ctx.services.goals.delete_goal(&actor, &goal.id).await.unwrap();
        assert!(ctx.services.goals.list_goals(&user.id, None).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_progress_is_not_lost() {
        let ctx = TestContext::new();
        let user = ctx.create_user("parallel").await;
        let goal = ctx.services.goals
            .create_goal(&user.id, request(GoalType::WeeklyHydration, 1000.0, ctx.today() + Duration::days(7)))
            .await
            .unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let goals = ctx.services.goals.clone();
                let actor = Actor::user(&user.id);
                let goal_id = goal.id.clone();
                tokio::spawn(async move { goals.log_progress(&actor, &goal_id, progress(10.0)).await })
            })
            .collect();

        let mut reached = Vec::new();
        for task in tasks {
            let outcome = task.await.unwrap().unwrap();
            reached.extend(outcome.new_achievements.into_iter().map(|a| a.milestone_name));
        }

        let stored = ctx.services.goals.get_goal(&Actor::user(&user.id), &goal.id).await.unwrap();
        assert_eq!(stored.current_value, 200.0);
        assert_eq!(reached, vec!["First Step".to_string()]);
        let view = ctx.services.goals.progress_view(&Actor::user(&user.id), &goal.id).await.unwrap();
        assert_eq!(view.entries.len(), 20);
    }

    #[tokio::test]
    async fn test_failed_milestone_render_stores_nothing() {
        let ctx = TestContext::new();
        let user = ctx.create_user("unlucky").await;
        let actor = Actor::user(&user.id);

        let mut notifications = MockNotificationServiceTrait::new();
        notifications
            .expect_render_template()
            .returning(|_, _, _| Err(ServiceError::NotFound("Notification template goal_milestone not found".to_string())));
        let goals = GoalService::new(
            HealthGoalRepository::with_pool(ctx.pool.clone()),
            Arc::new(notifications),
            ctx.clock.clone(),
        );

        let goal = goals
            .create_goal(&user.id, request(GoalType::WeeklyHydration, 1000.0, ctx.today() + Duration::days(7)))
            .await
            .unwrap();
        let err = goals.log_progress(&actor, &goal.id, progress(300.0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let view = goals.progress_view(&actor, &goal.id).await.unwrap();
        assert!(view.entries.is_empty());
        assert_eq!(view.current_value, 0.0);
        assert!(goals.goal_stats(&user.id).await.unwrap().recent_achievements.is_empty());
    }
}
