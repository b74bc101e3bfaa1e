pub mod errors;
pub mod locks;
pub mod realtime;
pub mod users;
pub mod water;
pub mod water_logs;
pub mod achievements;
pub mod notifications;
pub mod social;
pub mod goals;
pub mod reminders;
pub mod reports;
pub mod gdpr;
pub mod admin;

// Domain services
// Each aggregate has a service trait and a default implementation generic
// over its repository. Handlers hold them as trait objects.

use std::sync::Arc;

use crate::clock::{SharedClock, SystemClock};
use crate::fixtures::Fixtures;
use water_tracker_data::database::DatabasePool;
use water_tracker_data::repository::{
    AchievementRepository, GdprRepository, HealthGoalRepository, NotificationRepository, ReminderRepository,
    ReportRepository, SocialRepository, UserRepository, WaterLogRepository, WaterProductRepository,
};

// Re-export service traits and implementations
pub use errors::{validate_request, Actor, ServiceError};
pub use realtime::{NoopPublisher, RealtimePublisher};
pub use users::{UserService, UserServiceTrait};
pub use water::{WaterService, WaterServiceTrait};
pub use water_logs::{WaterLogService, WaterLogServiceTrait};
pub use achievements::{AchievementService, AchievementServiceTrait};
pub use notifications::{NotificationService, NotificationServiceTrait};
pub use social::{SocialService, SocialServiceTrait};
pub use goals::{GoalService, GoalServiceTrait};
pub use reminders::{ReminderService, ReminderServiceTrait};
pub use reports::{ReportService, ReportServiceTrait};
pub use gdpr::{GdprService, GdprServiceTrait};
pub use admin::{AdminService, AdminServiceTrait};

/// Every domain service, wired to one set of repositories
#[derive(Clone)]
pub struct Services {
    pub users: Arc<dyn UserServiceTrait + Send + Sync>,
    pub water: Arc<dyn WaterServiceTrait + Send + Sync>,
    pub water_logs: Arc<dyn WaterLogServiceTrait + Send + Sync>,
    pub achievements: Arc<dyn AchievementServiceTrait + Send + Sync>,
    pub notifications: Arc<dyn NotificationServiceTrait + Send + Sync>,
    pub social: Arc<dyn SocialServiceTrait + Send + Sync>,
    pub goals: Arc<dyn GoalServiceTrait + Send + Sync>,
    pub reminders: Arc<dyn ReminderServiceTrait + Send + Sync>,
    pub reports: Arc<dyn ReportServiceTrait + Send + Sync>,
    pub gdpr: Arc<dyn GdprServiceTrait + Send + Sync>,
    pub admin: Arc<dyn AdminServiceTrait + Send + Sync>,
}

fn repository<T>(pool: &Option<DatabasePool>, new: fn() -> T, with_pool: fn(DatabasePool) -> T) -> T {
    match pool {
        Some(pool) => with_pool(pool.clone()),
        None => new(),
    }
}

/// Build the service graph.
///
/// Without a pool the repositories use the global application pool, or the
/// shared in-memory database when none was initialized.
pub fn create_services(
    pool: Option<DatabasePool>,
    publisher: Arc<dyn RealtimePublisher>,
    clock: SharedClock,
    fixtures: Arc<Fixtures>,
) -> Services {
    let user_repository = repository(&pool, UserRepository::new, UserRepository::with_pool);
    let product_repository = repository(&pool, WaterProductRepository::new, WaterProductRepository::with_pool);
    let log_repository = repository(&pool, WaterLogRepository::new, WaterLogRepository::with_pool);
    let goal_repository = repository(&pool, HealthGoalRepository::new, HealthGoalRepository::with_pool);
    let achievement_repository = repository(&pool, AchievementRepository::new, AchievementRepository::with_pool);
    let notification_repository = repository(&pool, NotificationRepository::new, NotificationRepository::with_pool);

    let notifications: Arc<dyn NotificationServiceTrait + Send + Sync> = Arc::new(NotificationService::new(
        notification_repository.clone(),
        publisher.clone(),
        fixtures.clone(),
        clock.clone(),
    ));
    let users: Arc<dyn UserServiceTrait + Send + Sync> = Arc::new(UserService::new(
        user_repository.clone(),
        Arc::new(log_repository.clone()),
        clock.clone(),
    ));
    let achievements: Arc<dyn AchievementServiceTrait + Send + Sync> = Arc::new(AchievementService::new(
        achievement_repository.clone(),
        Arc::new(log_repository.clone()),
        notifications.clone(),
        publisher.clone(),
        clock.clone(),
    ));
    let social: Arc<dyn SocialServiceTrait + Send + Sync> = Arc::new(SocialService::new(
        repository(&pool, SocialRepository::new, SocialRepository::with_pool),
        Arc::new(user_repository.clone()),
        notifications.clone(),
        clock.clone(),
    ));
    let water_logs = Arc::new(WaterLogService::new(
        log_repository.clone(),
        Arc::new(product_repository.clone()),
        users.clone(),
        achievements.clone(),
        social.clone(),
        publisher,
        clock.clone(),
    ));
    let reports: Arc<dyn ReportServiceTrait + Send + Sync> = Arc::new(ReportService::new(
        repository(&pool, ReportRepository::new, ReportRepository::with_pool),
        Arc::new(user_repository.clone()),
        Arc::new(log_repository.clone()),
        Arc::new(goal_repository.clone()),
        Arc::new(achievement_repository),
        fixtures.clone(),
        clock.clone(),
    ));
    let gdpr = Arc::new(GdprService::new(
        repository(&pool, GdprRepository::new, GdprRepository::with_pool),
        Arc::new(user_repository.clone()),
        Arc::new(log_repository),
        Arc::new(goal_repository.clone()),
        Arc::new(notification_repository),
        reports.clone(),
        fixtures,
        clock.clone(),
    ));

    Services {
        users,
        water: Arc::new(WaterService::new(product_repository, clock.clone())),
        water_logs,
        achievements,
        notifications: notifications.clone(),
        social,
        goals: Arc::new(GoalService::new(goal_repository, notifications.clone(), clock.clone())),
        reminders: Arc::new(ReminderService::new(
            repository(&pool, ReminderRepository::new, ReminderRepository::with_pool),
            notifications.clone(),
            clock.clone(),
        )),
        reports,
        gdpr,
        admin: Arc::new(AdminService::new(user_repository, notifications, clock)),
    }
}

/// Services on the application database, the wall clock and the loaded fixtures
pub fn create_default_services(publisher: Arc<dyn RealtimePublisher>) -> Services {
    create_services(None, publisher, Arc::new(SystemClock), Fixtures::shared())
}
