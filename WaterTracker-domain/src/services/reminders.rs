use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::clock::SharedClock;
use crate::entities::conversions;
use crate::entities::reminder::{CreateReminderRequest, Reminder, UpdateReminderRequest, DEFAULT_REMINDER_MESSAGE};
use crate::fixtures::vars;
use crate::services::errors::{validate_request, Actor, ServiceError};
use crate::services::notifications::NotificationServiceTrait;
use water_tracker_data::repository::ReminderRepositoryTrait;

/// Trait for daily hydration reminders
#[async_trait]
pub trait ReminderServiceTrait {
    async fn create_reminder(&self, user_id: &str, request: CreateReminderRequest) -> Result<Reminder, ServiceError>;

    async fn get_reminder(&self, actor: &Actor, id: &str) -> Result<Reminder, ServiceError>;

    async fn list_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, ServiceError>;

    async fn update_reminder(
        &self,
        actor: &Actor,
        id: &str,
        request: UpdateReminderRequest,
    ) -> Result<Reminder, ServiceError>;

    async fn delete_reminder(&self, actor: &Actor, id: &str) -> Result<(), ServiceError>;

    /// Send every active reminder set for the current minute that has not
    /// gone out today. Returns the number sent.
    async fn dispatch_due(&self, now: DateTime<Utc>) -> Result<usize, ServiceError>;
}

/// Reminder service for domain logic
pub struct ReminderService<R: ReminderRepositoryTrait> {
    repository: R,
    notifications: Arc<dyn NotificationServiceTrait + Send + Sync>,
    clock: SharedClock,
}

impl<R: ReminderRepositoryTrait> ReminderService<R> {
    pub fn new(repository: R, notifications: Arc<dyn NotificationServiceTrait + Send + Sync>, clock: SharedClock) -> Self {
        Self { repository, notifications, clock }
    }

    async fn load_owned(&self, actor: &Actor, id: &str) -> Result<Reminder, ServiceError> {
        let stored = self.repository.get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Reminder", id))?;
        actor.ensure_can_access(&stored.user_id)?;
        Ok(conversions::convert_to_domain_reminder(stored))
    }
}

#[async_trait]
impl<R: ReminderRepositoryTrait + Send + Sync> ReminderServiceTrait for ReminderService<R> {
    async fn create_reminder(&self, user_id: &str, request: CreateReminderRequest) -> Result<Reminder, ServiceError> {
        validate_request(&request)?;

        let now = self.clock.now();
        let reminder = Reminder {
            id: conversions::new_id(),
            user_id: user_id.to_string(),
            message: request.message.unwrap_or_else(|| DEFAULT_REMINDER_MESSAGE.to_string()),
            time_of_day: request.time_of_day,
            is_active: true,
            last_sent_on: None,
            created_at: now,
            updated_at: now,
        };
        let stored = self.repository.create(conversions::convert_to_data_reminder(&reminder)).await?;
        info!("Created reminder {} at {} for user {}", reminder.id, reminder.time_of_day, user_id);
        Ok(conversions::convert_to_domain_reminder(stored))
    }

    async fn get_reminder(&self, actor: &Actor, id: &str) -> Result<Reminder, ServiceError> {
        self.load_owned(actor, id).await
    }

    async fn list_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, ServiceError> {
        Ok(self.repository.list_for_user(user_id)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_reminder)
            .collect())
    }

    async fn update_reminder(
        &self,
        actor: &Actor,
        id: &str,
        request: UpdateReminderRequest,
    ) -> Result<Reminder, ServiceError> {
        validate_request(&request)?;
        let mut reminder = self.load_owned(actor, id).await?;

        if let Some(message) = request.message {
            reminder.message = message;
        }
        if let Some(time_of_day) = request.time_of_day {
            reminder.time_of_day = time_of_day;
        }
        if let Some(is_active) = request.is_active {
            reminder.is_active = is_active;
        }
        reminder.updated_at = self.clock.now();

        let stored = self.repository.update(&conversions::convert_to_data_reminder(&reminder)).await?;
        info!("Updated reminder {}", id);
        Ok(conversions::convert_to_domain_reminder(stored))
    }

    async fn delete_reminder(&self, actor: &Actor, id: &str) -> Result<(), ServiceError> {
        self.load_owned(actor, id).await?;
        if !self.repository.delete(id).await? {
            return Err(ServiceError::not_found("Reminder", id));
        }
        info!("Deleted reminder {}", id);
        Ok(())
    }

    async fn dispatch_due(&self, now: DateTime<Utc>) -> Result<usize, ServiceError> {
        let time_of_day = now.format("%H:%M").to_string();
        let today = now.date_naive();
        let due = self.repository.list_due(&time_of_day, today).await?;
        debug!("{} reminders due at {}", due.len(), time_of_day);

        let mut sent = 0;
        for reminder in due {
            let result = self.notifications
                .create_from_template(
                    "hydration_reminder",
                    &reminder.user_id,
                    &vars([("message", reminder.message.clone())]),
                )
                .await;
            match result {
                Ok(_) => {
                    self.repository.mark_sent(&reminder.id, today).await?;
                    sent += 1;
                },
                Err(e) => error!("Failed to send reminder {}: {}", reminder.id, e),
            }
        }

        if sent > 0 {
            info!("Dispatched {} reminders", sent);
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use crate::entities::notification::NotificationType;
    use crate::testing::TestContext;

    fn at(time_of_day: &str) -> CreateReminderRequest {
        CreateReminderRequest { message: None, time_of_day: time_of_day.to_string() }
    }

    #[tokio::test]
    async fn test_create_defaults_and_validation() {
        let ctx = TestContext::new();
        let user = ctx.create_user("reminded").await;

        let reminder = ctx.services.reminders.create_reminder(&user.id, at("08:30")).await.unwrap();
        assert_eq!(reminder.message, DEFAULT_REMINDER_MESSAGE);
        assert!(reminder.is_active);

        for bad in ["8:30", "25:00", "noon"] {
            let err = ctx.services.reminders.create_reminder(&user.id, at(bad)).await.unwrap_err();
            assert!(matches!(err, ServiceError::ValidationError(_)), "{} accepted", bad);
        }
    }

    #[tokio::test]
    async fn test_dispatch_sends_once_per_day() {
        let ctx = TestContext::new();
        let user = ctx.create_user("thirsty").await;
        let custom = CreateReminderRequest { message: Some("Glass of water".to_string()), ..at("09:15") };
        ctx.services.reminders.create_reminder(&user.id, custom).await.unwrap();
        ctx.services.reminders.create_reminder(&user.id, at("18:00")).await.unwrap();

        let nine_fifteen = Utc.with_ymd_and_hms(2024, 4, 2, 9, 15, 30).unwrap();
        assert_eq!(ctx.services.reminders.dispatch_due(nine_fifteen).await.unwrap(), 1);
        assert_eq!(ctx.services.reminders.dispatch_due(nine_fifteen).await.unwrap(), 0);

        let inbox = ctx.services.notifications.list_notifications(&user.id, None, 0, 10).await.unwrap();
        assert_eq!(inbox.total, 1);
        assert_eq!(inbox.notifications[0].notification_type, NotificationType::GoalReminder);
        assert_eq!(inbox.notifications[0].message, "Glass of water");

        let next_day = nine_fifteen + Duration::days(1);
        assert_eq!(ctx.services.reminders.dispatch_due(next_day).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_inactive_reminders_are_skipped() {
        let ctx = TestContext::new();
        let user = ctx.create_user("paused").await;
        let actor = Actor::user(&user.id);
        let reminder = ctx.services.reminders.create_reminder(&user.id, at("07:00")).await.unwrap();

        let update = UpdateReminderRequest { is_active: Some(false), ..Default::default() };
        ctx.services.reminders.update_reminder(&actor, &reminder.id, update).await.unwrap();

        let seven = Utc.with_ymd_and_hms(2024, 4, 2, 7, 0, 0).unwrap();
        assert_eq!(ctx.services.reminders.dispatch_due(seven).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_owner_only_access() {
        let ctx = TestContext::new();
        let user = ctx.create_user("mine").await;
        let reminder = ctx.services.reminders.create_reminder(&user.id, at("10:00")).await.unwrap();

        let err = ctx.services.reminders.delete_reminder(&Actor::user("other"), &reminder.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        ctx.services.reminders.delete_reminder(&Actor::user(&user.id), &reminder.id).await.unwrap();
        assert!(ctx.services.reminders.list_reminders(&user.id).await.unwrap().is_empty());
    }
}
