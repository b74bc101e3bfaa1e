use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::clock::SharedClock;
use crate::entities::conversions;
use crate::entities::notification::{
    NewNotification, Notification, NotificationList, NotificationSettings, NotificationStatus,
    UpdateNotificationSettingsRequest,
};
use crate::entities::realtime::RealtimeEvent;
use crate::fixtures::Fixtures;
use crate::services::errors::{validate_request, Actor, ServiceError};
use crate::services::realtime::RealtimePublisher;
use water_tracker_data::repository::NotificationRepositoryTrait;

/// Trait for notification operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationServiceTrait {
    /// Store a notification and push it when the user's settings allow
    async fn create_notification(&self, notification: NewNotification) -> Result<Notification, ServiceError>;

    /// Render a fixture template without storing it
    fn render_template(
        &self,
        key: &str,
        user_id: &str,
        vars: &HashMap<String, String>,
    ) -> Result<NewNotification, ServiceError>;

    /// Render a fixture template and create the notification
    async fn create_from_template(
        &self,
        key: &str,
        user_id: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Notification, ServiceError>;

    async fn list_notifications(
        &self,
        user_id: &str,
        status: Option<NotificationStatus>,
        offset: usize,
        limit: usize,
    ) -> Result<NotificationList, ServiceError>;

    async fn get_notification(&self, actor: &Actor, id: &str) -> Result<Notification, ServiceError>;

    async fn mark_as_read(&self, actor: &Actor, id: &str) -> Result<Notification, ServiceError>;

    /// Returns how many notifications changed
    async fn mark_all_as_read(&self, user_id: &str) -> Result<usize, ServiceError>;

    async fn unread_count(&self, user_id: &str) -> Result<usize, ServiceError>;

    /// Move a notification to the deleted status
    async fn delete_notification(&self, actor: &Actor, id: &str) -> Result<(), ServiceError>;

    /// Stored settings, created with defaults on first read
    async fn get_settings(&self, user_id: &str) -> Result<NotificationSettings, ServiceError>;

    async fn update_settings(
        &self,
        user_id: &str,
        request: UpdateNotificationSettingsRequest,
    ) -> Result<NotificationSettings, ServiceError>;
}

/// Notification service for domain logic
pub struct NotificationService<R: NotificationRepositoryTrait> {
    repository: R,
    publisher: Arc<dyn RealtimePublisher>,
    fixtures: Arc<Fixtures>,
    clock: SharedClock,
}

impl<R: NotificationRepositoryTrait> NotificationService<R> {
    pub fn new(
        repository: R,
        publisher: Arc<dyn RealtimePublisher>,
        fixtures: Arc<Fixtures>,
        clock: SharedClock,
    ) -> Self {
        Self { repository, publisher, fixtures, clock }
    }

    async fn load(&self, id: &str) -> Result<Notification, ServiceError> {
        let stored = self.repository.get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification", id))?;
        conversions::convert_to_domain_notification(stored).map_err(ServiceError::corrupt)
    }

    async fn load_owned(&self, actor: &Actor, id: &str) -> Result<Notification, ServiceError> {
        let notification = self.load(id).await?;
        if notification.status == NotificationStatus::Deleted {
            return Err(ServiceError::not_found("Notification", id));
        }
        actor.ensure_can_access(&notification.user_id)?;
        Ok(notification)
    }
}

#[async_trait]
impl<R: NotificationRepositoryTrait + Send + Sync> NotificationServiceTrait for NotificationService<R> {
    async fn create_notification(&self, request: NewNotification) -> Result<Notification, ServiceError> {
        validate_request(&request)?;
        let now = self.clock.now();

        let notification = Notification {
            id: conversions::new_id(),
            user_id: request.user_id,
            notification_type: request.notification_type,
            title: request.title,
            message: request.message,
            priority: request.priority,
            status: NotificationStatus::Unread,
            created_at: now,
            read_at: None,
            related_entity_id: request.related_entity_id,
            related_entity_type: request.related_entity_type,
            payload: request.payload,
            action_url: request.action_url,
        };
        let stored = self.repository.create(conversions::convert_to_data_notification(&notification)).await?;
        let notification = conversions::convert_to_domain_notification(stored).map_err(ServiceError::corrupt)?;

        let settings = self.get_settings(&notification.user_id).await?;
        if settings.allows_delivery(notification.notification_type, now) {
            self.publisher
                .send_to_user(
                    &notification.user_id,
                    RealtimeEvent::NewNotification {
                        id: notification.id.clone(),
                        title: notification.title.clone(),
                        message: notification.message.clone(),
                        read: false,
                    },
                )
                .await;
        } else {
            debug!("Notification {} stored without a push", notification.id);
        }

        info!("Created {} notification for user {}", notification.notification_type, notification.user_id);
        Ok(notification)
    }

    fn render_template(
        &self,
        key: &str,
        user_id: &str,
        vars: &HashMap<String, String>,
    ) -> Result<NewNotification, ServiceError> {
        let template = self.fixtures
            .notification_template(key)
            .ok_or_else(|| ServiceError::NotFound(format!("Notification template {} not found", key)))?;
        let (title, message) = template.render(vars);
        Ok(NewNotification::new(user_id, template.notification_type, title, message).with_priority(template.priority))
    }

    async fn create_from_template(
        &self,
        key: &str,
        user_id: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Notification, ServiceError> {
        let notification = self.render_template(key, user_id, vars)?;
        self.create_notification(notification).await
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        status: Option<NotificationStatus>,
        offset: usize,
        limit: usize,
    ) -> Result<NotificationList, ServiceError> {
        let (stored, total) = self.repository
            .list(user_id, status.map(|s| s.as_str()), offset, limit)
            .await?;
        let notifications = stored
            .into_iter()
            .map(conversions::convert_to_domain_notification)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)?;
        let unread_count = self.repository.count_unread(user_id).await?;

        Ok(NotificationList { notifications, total, unread_count })
    }

    async fn get_notification(&self, actor: &Actor, id: &str) -> Result<Notification, ServiceError> {
        self.load_owned(actor, id).await
    }

    async fn mark_as_read(&self, actor: &Actor, id: &str) -> Result<Notification, ServiceError> {
        self.load_owned(actor, id).await?;
        let updated = self.repository
            .mark_read(id, self.clock.now())
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification", id))?;
        conversions::convert_to_domain_notification(updated).map_err(ServiceError::corrupt)
    }

    async fn mark_all_as_read(&self, user_id: &str) -> Result<usize, ServiceError> {
        let changed = self.repository.mark_all_read(user_id, self.clock.now()).await?;
        debug!("Marked {} notifications read for {}", changed, user_id);
        Ok(changed)
    }

    async fn unread_count(&self, user_id: &str) -> Result<usize, ServiceError> {
        Ok(self.repository.count_unread(user_id).await?)
    }

    async fn delete_notification(&self, actor: &Actor, id: &str) -> Result<(), ServiceError> {
        self.load_owned(actor, id).await?;
        self.repository.set_status(id, NotificationStatus::Deleted.as_str()).await?;
        info!("Deleted notification {}", id);
        Ok(())
    }

    async fn get_settings(&self, user_id: &str) -> Result<NotificationSettings, ServiceError> {
        if let Some(stored) = self.repository.get_settings(user_id).await? {
            return Ok(conversions::convert_to_domain_settings(stored));
        }

        let defaults = NotificationSettings::defaults(user_id, self.clock.now());
        let stored = self.repository.save_settings(&conversions::convert_to_data_settings(&defaults)).await?;
        Ok(conversions::convert_to_domain_settings(stored))
    }

    async fn update_settings(
        &self,
        user_id: &str,
        request: UpdateNotificationSettingsRequest,
    ) -> Result<NotificationSettings, ServiceError> {
        validate_request(&request)?;
        let mut settings = self.get_settings(user_id).await?;

        if let Some(enabled) = request.master_enabled {
            settings.master_enabled = enabled;
        }
        if let Some(preferences) = request.type_preferences {
            settings.type_preferences.extend(preferences);
        }
        if let Some(enabled) = request.quiet_hours_enabled {
            settings.quiet_hours_enabled = enabled;
        }
        if let Some(start) = request.quiet_hours_start {
            settings.quiet_hours_start = Some(start);
        }
        if let Some(end) = request.quiet_hours_end {
            settings.quiet_hours_end = Some(end);
        }
        if settings.quiet_hours_enabled
            && (settings.quiet_hours_start.is_none() || settings.quiet_hours_end.is_none())
        {
            return Err(ServiceError::ValidationError(
                "quiet_hours: start and end are required when quiet hours are enabled".to_string(),
            ));
        }
        settings.updated_at = self.clock.now();

        let stored = self.repository.save_settings(&conversions::convert_to_data_settings(&settings)).await?;
        info!("Updated notification settings for {}", user_id);
        Ok(conversions::convert_to_domain_settings(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::entities::notification::NotificationType;
    use crate::fixtures::vars;
    use crate::testing::TestContext;

    async fn context_with_user(hour: u32) -> (TestContext, String) {
        let ctx = TestContext::at(Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap());
        let user = ctx.create_user("notified").await;
        (ctx, user.id)
    }

    fn reminder(user_id: &str) -> NewNotification {
        NewNotification::new(user_id, NotificationType::GoalReminder, "Drink", "Time for water")
    }

    #[tokio::test]
    async fn test_create_pushes_when_allowed() {
        let (ctx, user_id) = context_with_user(12).await;
        let created = ctx.services.notifications.create_notification(reminder(&user_id)).await.unwrap();

        assert_eq!(created.status, NotificationStatus::Unread);
        let pushed = ctx.publisher.events_for(&user_id);
        assert_eq!(pushed.len(), 1);
        assert!(matches!(&pushed[0], RealtimeEvent::NewNotification { id, read: false, .. } if *id == created.id));
    }

    #[tokio::test]
    async fn test_quiet_hours_suppress_push_but_store() {
        let (ctx, user_id) = context_with_user(23).await;
        let request = UpdateNotificationSettingsRequest {
            quiet_hours_enabled: Some(true),
            quiet_hours_start: Some("22:00".to_string()),
            quiet_hours_end: Some("07:00".to_string()),
            ..Default::default()
        };
        ctx.services.notifications.update_settings(&user_id, request).await.unwrap();

        ctx.services.notifications.create_notification(reminder(&user_id)).await.unwrap();
        assert!(ctx.publisher.events_for(&user_id).is_empty());
        assert_eq!(ctx.services.notifications.unread_count(&user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_type_toggle_suppresses_push() {
        let (ctx, user_id) = context_with_user(12).await;
        let request = UpdateNotificationSettingsRequest {
            type_preferences: Some([(NotificationType::GoalReminder, false)].into_iter().collect()),
            ..Default::default()
        };
        let settings = ctx.services.notifications.update_settings(&user_id, request).await.unwrap();
        assert!(!settings.type_enabled(NotificationType::GoalReminder));
        assert!(settings.type_enabled(NotificationType::FriendRequest));

        ctx.services.notifications.create_notification(reminder(&user_id)).await.unwrap();
        assert!(ctx.publisher.events_for(&user_id).is_empty());
    }

    #[tokio::test]
    async fn test_quiet_hours_need_both_bounds() {
        let (ctx, user_id) = context_with_user(12).await;
        let request = UpdateNotificationSettingsRequest { quiet_hours_enabled: Some(true), ..Default::default() };
        let err = ctx.services.notifications.update_settings(&user_id, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_template_rendering() {
        let (ctx, user_id) = context_with_user(12).await;
        let created = ctx.services.notifications
            .create_from_template("friend_request", &user_id, &vars([("username", "otter".to_string())]))
            .await
            .unwrap();
        assert_eq!(created.notification_type, NotificationType::FriendRequest);
        assert_eq!(created.message, "otter wants to be your friend.");

        let err = ctx.services.notifications
            .create_from_template("no_such_template", &user_id, &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_and_delete_lifecycle() {
        let (ctx, user_id) = context_with_user(12).await;
        let owner = Actor::user(&user_id);
        let first = ctx.services.notifications.create_notification(reminder(&user_id)).await.unwrap();
        ctx.services.notifications.create_notification(reminder(&user_id)).await.unwrap();
        ctx.services.notifications.create_notification(reminder(&user_id)).await.unwrap();

        let err = ctx.services.notifications.mark_as_read(&Actor::user("intruder"), &first.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let read = ctx.services.notifications.mark_as_read(&owner, &first.id).await.unwrap();
        assert_eq!(read.status, NotificationStatus::Read);
        assert!(read.read_at.is_some());

        assert_eq!(ctx.services.notifications.mark_all_as_read(&user_id).await.unwrap(), 2);
        assert_eq!(ctx.services.notifications.unread_count(&user_id).await.unwrap(), 0);

        ctx.services.notifications.delete_notification(&owner, &first.id).await.unwrap();
        let list = ctx.services.notifications.list_notifications(&user_id, None, 0, 10).await.unwrap();
        assert_eq!(list.total, 2);
        assert!(list.notifications.iter().all(|n| n.id != first.id));
        assert!(matches!(
            ctx.services.notifications.get_notification(&owner, &first.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}
