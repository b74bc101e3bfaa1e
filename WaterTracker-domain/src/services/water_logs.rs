use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::clock::{end_of_day, start_of_day, SharedClock};
use crate::entities::conversions;
use crate::entities::realtime::{leaderboard_channel, RealtimeEvent, GLOBAL_LEADERBOARD};
use crate::entities::water::UNKNOWN_PACKAGING;
use crate::entities::water_log::{
    CreateWaterLogRequest, DailySummary, HydrationAnalytics, LogPage, LogSearchCriteria, UpdateWaterLogRequest,
    WaterLog,
};
use crate::services::achievements::AchievementServiceTrait;
use crate::services::errors::{validate_request, Actor, ServiceError};
use crate::services::realtime::RealtimePublisher;
use crate::services::social::SocialServiceTrait;
use crate::services::users::UserServiceTrait;
use water_tracker_data::models::water_log::WaterLogFilter;
use water_tracker_data::repository::{WaterLogRepositoryTrait, WaterProductRepositoryTrait};

/// XP granted per log
pub const LOG_XP: i64 = 10;
/// Points granted per log
pub const LOG_POINTS: i64 = 5;
/// Entries pushed with each leaderboard update
pub const LEADERBOARD_BROADCAST_SIZE: usize = 10;
/// Page size when a search has no limit
pub const DEFAULT_LOG_PAGE_SIZE: usize = 50;
const MAX_LOG_PAGE_SIZE: usize = 500;
/// Days covered by the analytics window, today included
pub const ANALYTICS_WINDOW_DAYS: i64 = 30;

/// Trait for water intake logging
#[async_trait]
pub trait WaterLogServiceTrait {
    /// Record intake and apply the gamification side effects
    async fn log_water(&self, user_id: &str, request: CreateWaterLogRequest) -> Result<WaterLog, ServiceError>;

    async fn get_log(&self, actor: &Actor, id: &str) -> Result<WaterLog, ServiceError>;

    async fn search_logs(&self, user_id: &str, criteria: &LogSearchCriteria) -> Result<LogPage, ServiceError>;

    async fn update_log(&self, actor: &Actor, id: &str, request: UpdateWaterLogRequest) -> Result<WaterLog, ServiceError>;

    async fn delete_log(&self, actor: &Actor, id: &str) -> Result<(), ServiceError>;

    async fn daily_summary(&self, user_id: &str, date: NaiveDate) -> Result<DailySummary, ServiceError>;

    /// Analytics over the last thirty days
    async fn analytics(&self, user_id: &str) -> Result<HydrationAnalytics, ServiceError>;
}

/// Water log service for domain logic
pub struct WaterLogService<R: WaterLogRepositoryTrait> {
    repository: R,
    products: Arc<dyn WaterProductRepositoryTrait + Send + Sync>,
    users: Arc<dyn UserServiceTrait + Send + Sync>,
    achievements: Arc<dyn AchievementServiceTrait + Send + Sync>,
    social: Arc<dyn SocialServiceTrait + Send + Sync>,
    publisher: Arc<dyn RealtimePublisher>,
    clock: SharedClock,
}

impl<R: WaterLogRepositoryTrait> WaterLogService<R> {
    pub fn new(
        repository: R,
        products: Arc<dyn WaterProductRepositoryTrait + Send + Sync>,
        users: Arc<dyn UserServiceTrait + Send + Sync>,
        achievements: Arc<dyn AchievementServiceTrait + Send + Sync>,
        social: Arc<dyn SocialServiceTrait + Send + Sync>,
        publisher: Arc<dyn RealtimePublisher>,
        clock: SharedClock,
    ) -> Self {
        Self { repository, products, users, achievements, social, publisher, clock }
    }

    async fn load_owned(&self, actor: &Actor, id: &str) -> Result<WaterLog, ServiceError> {
        let stored = self.repository.get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Water log", id))?;
        actor.ensure_can_access(&stored.user_id)?;
        Ok(conversions::convert_to_domain_log(stored))
    }

    async fn broadcast_leaderboard(&self) -> Result<(), ServiceError> {
        let entries = self.social.leaderboard(LEADERBOARD_BROADCAST_SIZE).await?;
        self.publisher
            .broadcast(
                &leaderboard_channel(GLOBAL_LEADERBOARD),
                RealtimeEvent::LeaderboardUpdate {
                    leaderboard_id: GLOBAL_LEADERBOARD.to_string(),
                    entries,
                },
            )
            .await;
        Ok(())
    }
}

#[async_trait]
impl<R: WaterLogRepositoryTrait + Send + Sync> WaterLogServiceTrait for WaterLogService<R> {
    async fn log_water(&self, user_id: &str, request: CreateWaterLogRequest) -> Result<WaterLog, ServiceError> {
        validate_request(&request)?;

        if let Some(water_id) = request.water_id {
            if self.products.get_by_id(water_id).await?.is_none() {
                warn!("Rejected log for unknown water product {}", water_id);
                return Err(ServiceError::ValidationError(format!("Unknown water product: {}", water_id)));
            }
        }
        self.users.get_user(user_id).await?;

        let now = self.clock.now();
        let log = WaterLog {
            id: conversions::new_id(),
            user_id: user_id.to_string(),
            water_id: request.water_id,
            volume_ml: request.volume_ml,
            drink_type: request.drink_type,
            caffeine_mg: request.caffeine_mg,
            logged_at: request.logged_at.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };
        let stored = self.repository.create(conversions::convert_to_data_log(&log)).await?;
        let log = conversions::convert_to_domain_log(stored);
        info!("User {} logged {} ml", user_id, log.volume_ml);

        self.users.award_activity(user_id, LOG_XP, LOG_POINTS, now.date_naive()).await?;
        self.achievements.check_and_grant(user_id).await?;
        self.social
            .record_activity(
                user_id,
                "logged_water",
                json!({"log_id": log.id, "volume_ml": log.volume_ml, "water_id": log.water_id}),
            )
            .await?;
        self.broadcast_leaderboard().await?;

        Ok(log)
    }

    async fn get_log(&self, actor: &Actor, id: &str) -> Result<WaterLog, ServiceError> {
        self.load_owned(actor, id).await
    }

    async fn search_logs(&self, user_id: &str, criteria: &LogSearchCriteria) -> Result<LogPage, ServiceError> {
        if let (Some(start), Some(end)) = (criteria.start_date, criteria.end_date) {
            if end < start {
                return Err(ServiceError::ValidationError("end_date must not be before start_date".to_string()));
            }
        }
        let limit = criteria.limit.unwrap_or(DEFAULT_LOG_PAGE_SIZE).clamp(1, MAX_LOG_PAGE_SIZE);

        let filter = WaterLogFilter {
            user_id: Some(user_id.to_string()),
            start: criteria.start_date.map(start_of_day),
            end: criteria.end_date.map(end_of_day),
            min_volume: criteria.min_volume,
            max_volume: criteria.max_volume,
            brand_names: criteria.brand_names.clone(),
            packaging_types: criteria.packaging_types.clone(),
            limit: Some(limit),
            offset: Some(criteria.offset),
        };
        let (stored, total) = self.repository.find(&filter).await?;

        Ok(LogPage {
            logs: stored.into_iter().map(conversions::convert_to_domain_log).collect(),
            total,
            offset: criteria.offset,
            limit,
        })
    }

    async fn update_log(&self, actor: &Actor, id: &str, request: UpdateWaterLogRequest) -> Result<WaterLog, ServiceError> {
        validate_request(&request)?;
        let mut log = self.load_owned(actor, id).await?;

        if let Some(volume_ml) = request.volume_ml {
            log.volume_ml = volume_ml;
        }
        if let Some(logged_at) = request.logged_at {
            log.logged_at = logged_at;
        }
        log.updated_at = self.clock.now();

        let stored = self.repository.update(&conversions::convert_to_data_log(&log)).await?;
        info!("Updated water log {}", id);
        Ok(conversions::convert_to_domain_log(stored))
    }

    async fn delete_log(&self, actor: &Actor, id: &str) -> Result<(), ServiceError> {
        self.load_owned(actor, id).await?;
        if !self.repository.soft_delete(id, self.clock.now()).await? {
            return Err(ServiceError::not_found("Water log", id));
        }
        info!("Deleted water log {}", id);
        Ok(())
    }

    async fn daily_summary(&self, user_id: &str, date: NaiveDate) -> Result<DailySummary, ServiceError> {
        let user = self.users.get_user(user_id).await?;
        let day = self.repository
            .daily_volumes(user_id, start_of_day(date), start_of_day(date + Duration::days(1)))
            .await?
            .into_iter()
            .find(|d| d.date == date);

        let (total_volume_ml, log_count) = day.map(|d| (d.total_volume_ml, d.log_count)).unwrap_or((0, 0));
        let percent_of_goal = if user.daily_goal_ml > 0 {
            total_volume_ml as f64 / user.daily_goal_ml as f64 * 100.0
        } else {
            0.0
        };

        Ok(DailySummary {
            date,
            total_volume_ml,
            goal_ml: user.daily_goal_ml,
            percent_of_goal,
            log_count,
            goal_met: total_volume_ml >= user.daily_goal_ml,
        })
    }

    async fn analytics(&self, user_id: &str) -> Result<HydrationAnalytics, ServiceError> {
        let period_end = self.clock.now().date_naive();
        let period_start = period_end - Duration::days(ANALYTICS_WINDOW_DAYS - 1);
        let rows = self.repository.with_products_since(user_id, start_of_day(period_start)).await?;
        debug!("Computing analytics for {} over {} logs", user_id, rows.len());

        let mut total_volume_ml = 0;
        let mut brands: BTreeMap<String, i64> = BTreeMap::new();
        let mut packaging_breakdown: BTreeMap<String, i64> = BTreeMap::new();
        for row in &rows {
            total_volume_ml += row.log.volume_ml;
            if let Some(brand) = &row.brand_name {
                *brands.entry(brand.clone()).or_default() += 1;
            }
            let packaging = row.packaging.clone().unwrap_or_else(|| UNKNOWN_PACKAGING.to_string());
            *packaging_breakdown.entry(packaging).or_default() += 1;
        }

        let mut most_frequent_brand: Option<(String, i64)> = None;
        for (brand, count) in brands {
            if most_frequent_brand.as_ref().map_or(true, |(_, best)| count > *best) {
                most_frequent_brand = Some((brand, count));
            }
        }

        Ok(HydrationAnalytics {
            period_start,
            period_end,
            total_logs: rows.len() as i64,
            total_volume_ml,
            average_daily_volume_ml: total_volume_ml as f64 / ANALYTICS_WINDOW_DAYS as f64,
            most_frequent_brand: most_frequent_brand.map(|(brand, _)| brand),
            packaging_breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::clock::Clock;
    use crate::testing::TestContext;

    fn request(volume_ml: i64) -> CreateWaterLogRequest {
        CreateWaterLogRequest { water_id: None, volume_ml, drink_type: None, caffeine_mg: None, logged_at: None }
    }

    async fn with_catalogue(ctx: &TestContext) {
        let catalogue = serde_json::json!([
            {"id": 1, "name": "Alpine", "brand_name": "Peak", "score": 90, "packaging": "glass"},
            {"id": 2, "name": "Tap", "brand_name": "City", "score": 50, "packaging": "plastic"}
        ]);
        ctx.services.water.import_products(&catalogue.to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn test_log_water_grants_xp_and_broadcasts() {
        let ctx = TestContext::new();
        let user = ctx.create_user("drinker").await;

        let log = ctx.services.water_logs.log_water(&user.id, request(300)).await.unwrap();
        assert_eq!(log.logged_at, ctx.clock.now());

        let updated = ctx.services.users.get_user(&user.id).await.unwrap();
        assert_eq!(updated.xp, LOG_XP);
        assert_eq!(updated.points, LOG_POINTS);
        assert_eq!(updated.current_streak, 1);

        let feed = ctx.services.social.activity_feed(&user.id, 5).await.unwrap();
        assert_eq!(feed[0].activity_type, "logged_water");

        let broadcasts = ctx.publisher.broadcasts_on("leaderboard:global");
        assert_eq!(broadcasts.len(), 1);
        match &broadcasts[0] {
            RealtimeEvent::LeaderboardUpdate { entries, .. } => {
                assert_eq!(entries[0].user_id, user.id);
                assert_eq!(entries[0].rank, 1);
            },
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_log_water_validation() {
        let ctx = TestContext::new();
        let user = ctx.create_user("careful").await;

        let err = ctx.services.water_logs.log_water(&user.id, request(0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));

        let unknown = CreateWaterLogRequest { water_id: Some(404), ..request(250) };
        let err = ctx.services.water_logs.log_water(&user.id, unknown).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(msg) if msg.contains("404")));
    }

    #[tokio::test]
    async fn test_streak_across_days() {
        let ctx = TestContext::at(Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap());
        let user = ctx.create_user("steady").await;

        ctx.services.water_logs.log_water(&user.id, request(250)).await.unwrap();
        ctx.clock.advance(Duration::days(1));
        ctx.services.water_logs.log_water(&user.id, request(250)).await.unwrap();
        ctx.services.water_logs.log_water(&user.id, request(250)).await.unwrap();

        let updated = ctx.services.users.get_user(&user.id).await.unwrap();
        assert_eq!(updated.current_streak, 2);
        assert_eq!(updated.longest_streak, 2);
    }

    #[tokio::test]
    async fn test_owner_only_access_and_soft_delete() {
        let ctx = TestContext::new();
        let user = ctx.create_user("private").await;
        let owner = Actor::user(&user.id);
        let log = ctx.services.water_logs.log_water(&user.id, request(400)).await.unwrap();

        let err = ctx.services.water_logs.get_log(&Actor::user("stranger"), &log.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let updated = ctx.services.water_logs
            .update_log(&owner, &log.id, UpdateWaterLogRequest { volume_ml: Some(450), logged_at: None })
            .await
            .unwrap();
        assert_eq!(updated.volume_ml, 450);

        ctx.services.water_logs.delete_log(&owner, &log.id).await.unwrap();
        assert!(matches!(
            ctx.services.water_logs.get_log(&owner, &log.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_search_by_brand_and_dates() {
        let ctx = TestContext::at(Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap());
        with_catalogue(&ctx).await;
        let user = ctx.create_user("searcher").await;

        let at = |day| Some(Utc.with_ymd_and_hms(2024, 7, day, 8, 0, 0).unwrap());
        for (water_id, day) in [(Some(1), 1), (Some(2), 5), (None, 9)] {
            let req = CreateWaterLogRequest { water_id, logged_at: at(day), ..request(300) };
            ctx.services.water_logs.log_water(&user.id, req).await.unwrap();
        }

        let criteria = LogSearchCriteria { brand_names: vec!["peak".to_string()], ..Default::default() };
        let page = ctx.services.water_logs.search_logs(&user.id, &criteria).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.logs[0].water_id, Some(1));

        let criteria = LogSearchCriteria {
            start_date: NaiveDate::from_ymd_opt(2024, 7, 5),
            end_date: NaiveDate::from_ymd_opt(2024, 7, 9),
            ..Default::default()
        };
        let page = ctx.services.water_logs.search_logs(&user.id, &criteria).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.limit, DEFAULT_LOG_PAGE_SIZE);

        let backwards = LogSearchCriteria {
            start_date: NaiveDate::from_ymd_opt(2024, 7, 9),
            end_date: NaiveDate::from_ymd_opt(2024, 7, 5),
            ..Default::default()
        };
        assert!(ctx.services.water_logs.search_logs(&user.id, &backwards).await.is_err());
    }

    #[tokio::test]
    async fn test_daily_summary_and_analytics() {
        let ctx = TestContext::at(Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap());
        with_catalogue(&ctx).await;
        let user = ctx.create_user("analyst").await;

        for water_id in [Some(1), Some(1), Some(2)] {
            let req = CreateWaterLogRequest { water_id, ..request(800) };
            ctx.services.water_logs.log_water(&user.id, req).await.unwrap();
        }

        let summary = ctx.services.water_logs.daily_summary(&user.id, ctx.today()).await.unwrap();
        assert_eq!(summary.total_volume_ml, 2400);
        assert_eq!(summary.log_count, 3);
        assert!(summary.goal_met);
        assert!((summary.percent_of_goal - 120.0).abs() < 1e-9);

        let analytics = ctx.services.water_logs.analytics(&user.id).await.unwrap();
        assert_eq!(analytics.total_logs, 3);
        assert_eq!(analytics.most_frequent_brand.as_deref(), Some("Peak"));
        assert_eq!(analytics.packaging_breakdown.get("glass"), Some(&2));
        assert_eq!(analytics.period_start, NaiveDate::from_ymd_opt(2024, 6, 11).unwrap());
        assert!((analytics.average_daily_volume_ml - 80.0).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_logs_keep_every_award() {
        let ctx = TestContext::new();
        let user = ctx.create_user("thirsty").await;

        let tasks: Vec<_> = (0..40)
            .map(|_| {
                let logs = ctx.services.water_logs.clone();
                let user_id = user.id.clone();
                tokio::spawn(async move { logs.log_water(&user_id, request(100)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = ctx.services.users.get_user(&user.id).await.unwrap();
        assert_eq!(stored.xp, 40 * LOG_XP);
        assert_eq!(stored.points, 40 * LOG_POINTS);
        assert_eq!(stored.level, crate::services::users::level_for_xp(40 * LOG_XP));

        // 40 logs: first_sip stage 1 at one log, stage 2 at ten, each granted once
        let stages: Vec<i64> = ctx.publisher
            .events_for(&user.id)
            .into_iter()
            .filter_map(|event| match event {
                RealtimeEvent::AchievementUnlocked { achievement_id, stage, .. } if achievement_id == "first_sip" => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec![1, 2]);
    }
}
