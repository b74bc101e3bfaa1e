// Repository module structure
pub mod errors;
mod in_memory;
mod storage;

mod users;
mod water_products;
mod water_logs;
mod health_goals;
mod achievements;
mod notifications;
mod reminders;
mod social;
mod reports;
mod gdpr;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use storage::DatabaseStorage;
pub use users::{UserRepository, UserRepositoryTrait};
pub use water_products::{WaterProductRepository, WaterProductRepositoryTrait};
pub use water_logs::{WaterLogRepository, WaterLogRepositoryTrait};
pub use health_goals::{HealthGoalRepository, HealthGoalRepositoryTrait};
pub use achievements::{AchievementRepository, AchievementRepositoryTrait};
pub use notifications::{NotificationRepository, NotificationRepositoryTrait};
pub use reminders::{ReminderRepository, ReminderRepositoryTrait};
pub use social::{SocialRepository, SocialRepositoryTrait};
pub use reports::{ReportRepository, ReportRepositoryTrait};
pub use gdpr::{GdprRepository, GdprRepositoryTrait};
