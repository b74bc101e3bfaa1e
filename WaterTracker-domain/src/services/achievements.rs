use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::clock::SharedClock;
use crate::entities::achievement::{default_catalog, AchievementDefinition, CriteriaType, UserAchievement};
use crate::entities::conversions;
use crate::entities::realtime::RealtimeEvent;
use crate::fixtures::vars;
use crate::services::errors::ServiceError;
use crate::services::locks::KeyedLocks;
use crate::services::notifications::NotificationServiceTrait;
use crate::services::realtime::RealtimePublisher;
use water_tracker_data::repository::{AchievementRepositoryTrait, WaterLogRepositoryTrait};

/// Trait for staged achievements
#[async_trait]
pub trait AchievementServiceTrait {
    /// Insert the built-in definitions that are missing. Returns how many were added.
    async fn seed_catalog(&self) -> Result<usize, ServiceError>;

    async fn list_catalog(&self) -> Result<Vec<AchievementDefinition>, ServiceError>;

    async fn list_user_achievements(&self, user_id: &str) -> Result<Vec<UserAchievement>, ServiceError>;

    /// Advance the user at most one stage per achievement; returns the advances
    async fn check_and_grant(&self, user_id: &str) -> Result<Vec<UserAchievement>, ServiceError>;
}

/// Achievement service for domain logic
pub struct AchievementService<R: AchievementRepositoryTrait> {
    repository: R,
    logs: Arc<dyn WaterLogRepositoryTrait + Send + Sync>,
    notifications: Arc<dyn NotificationServiceTrait + Send + Sync>,
    publisher: Arc<dyn RealtimePublisher>,
    clock: SharedClock,
    user_locks: KeyedLocks,
}

impl<R: AchievementRepositoryTrait> AchievementService<R> {
    pub fn new(
        repository: R,
        logs: Arc<dyn WaterLogRepositoryTrait + Send + Sync>,
        notifications: Arc<dyn NotificationServiceTrait + Send + Sync>,
        publisher: Arc<dyn RealtimePublisher>,
        clock: SharedClock,
    ) -> Self {
        Self { repository, logs, notifications, publisher, clock, user_locks: KeyedLocks::new() }
    }

    async fn definitions(&self) -> Result<Vec<AchievementDefinition>, ServiceError> {
        self.repository.list_definitions()
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_definition)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)
    }
}

#[async_trait]
impl<R: AchievementRepositoryTrait + Send + Sync> AchievementServiceTrait for AchievementService<R> {
    async fn seed_catalog(&self) -> Result<usize, ServiceError> {
        let mut inserted = 0;
        for definition in default_catalog() {
            if self.repository
                .insert_definition_if_absent(&conversions::convert_to_data_definition(&definition))
                .await?
            {
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!("Seeded {} achievement definitions", inserted);
        }
        Ok(inserted)
    }

    async fn list_catalog(&self) -> Result<Vec<AchievementDefinition>, ServiceError> {
        self.definitions().await
    }

    async fn list_user_achievements(&self, user_id: &str) -> Result<Vec<UserAchievement>, ServiceError> {
        Ok(self.repository.list_for_user(user_id)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_user_achievement)
            .collect())
    }

    async fn check_and_grant(&self, user_id: &str) -> Result<Vec<UserAchievement>, ServiceError> {
        let mut definitions = self.definitions().await?;
        if definitions.is_empty() {
            self.seed_catalog().await?;
            definitions = self.definitions().await?;
        }

        // Stages are read then advanced; concurrent checks must not grant one twice
        let _guard = self.user_locks.lock(user_id).await;
        let (log_count, total_volume) = self.logs.totals(user_id).await?;
        let mut granted = Vec::new();

        for definition in definitions {
            let stage = self.repository
                .get_user_achievement(user_id, &definition.id)
                .await?
                .map(|a| a.stage)
                .unwrap_or(0);
            let Some(threshold) = definition.next_threshold(stage.max(0) as usize) else {
                continue;
            };
            let metric = match definition.criteria.criteria_type {
                CriteriaType::LogCount => log_count,
                CriteriaType::TotalVolume => total_volume,
            };
            if metric < threshold {
                continue;
            }

            let next_stage = stage + 1;
            let stored = self.repository
                .set_stage(user_id, &definition.id, next_stage, self.clock.now())
                .await?;
            info!("User {} reached stage {} of {}", user_id, next_stage, definition.id);

            self.notifications
                .create_from_template(
                    "achievement_unlocked",
                    user_id,
                    &vars([("achievement", definition.name.clone()), ("stage", next_stage.to_string())]),
                )
                .await?;
            self.publisher
                .send_to_user(
                    user_id,
                    RealtimeEvent::AchievementUnlocked {
                        achievement_id: definition.id.clone(),
                        name: definition.name.clone(),
                        stage: next_stage,
                    },
                )
                .await;

            granted.push(conversions::convert_to_domain_user_achievement(stored));
        }

        debug!("Granted {} achievement stages to {}", granted.len(), user_id);
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::water_log::CreateWaterLogRequest;
    use crate::testing::TestContext;

    fn log(volume_ml: i64) -> CreateWaterLogRequest {
        CreateWaterLogRequest { water_id: None, volume_ml, drink_type: None, caffeine_mg: None, logged_at: None }
    }

    #[tokio::test]
    async fn test_seed_catalog_is_idempotent() {
        let ctx = TestContext::new();
        assert_eq!(ctx.services.achievements.seed_catalog().await.unwrap(), 2);
        assert_eq!(ctx.services.achievements.seed_catalog().await.unwrap(), 0);
        assert_eq!(ctx.services.achievements.list_catalog().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_first_log_unlocks_first_stage() {
        let ctx = TestContext::new();
        let user = ctx.create_user("sipper").await;

        ctx.services.water_logs.log_water(&user.id, log(250)).await.unwrap();

        let held = ctx.services.achievements.list_user_achievements(&user.id).await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].achievement_id, "first_sip");
        assert_eq!(held[0].stage, 1);

        let unlocked: Vec<_> = ctx.publisher
            .events_for(&user.id)
            .into_iter()
            .filter(|e| matches!(e, RealtimeEvent::AchievementUnlocked { .. }))
            .collect();
        assert_eq!(unlocked.len(), 1);
    }

    #[tokio::test]
    async fn test_advances_one_stage_per_check() {
        let ctx = TestContext::new();
        let user = ctx.create_user("gulper").await;
        for _ in 0..3 {
            ctx.services.water_logs.log_water(&user.id, log(5000)).await.unwrap();
        }
        // 3 logs and 15 000 ml: first_sip stays at 1, hydration_hero reached stage 1 on the second log
        let held = ctx.services.achievements.list_user_achievements(&user.id).await.unwrap();
        let stage_of = |id: &str| held.iter().find(|a| a.achievement_id == id).map(|a| a.stage);
        assert_eq!(stage_of("first_sip"), Some(1));
        assert_eq!(stage_of("hydration_hero"), Some(1));

        // Nothing left to grant at these totals
        assert!(ctx.services.achievements.check_and_grant(&user.id).await.unwrap().is_empty());
    }
}
