use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::notification::{Notification, NotificationSettings};
use super::errors::RepositoryError;
use super::storage::{json_column, optional, to_json, DatabaseStorage};

const NOTIFICATION_COLUMNS: &str = "id, user_id, notification_type, title, message, priority, status, \
    created_at, read_at, related_entity_id, related_entity_type, payload, action_url";

/// Repository trait for notifications and delivery settings
#[async_trait]
pub trait NotificationRepositoryTrait {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Notification>, RepositoryError>;

    /// Notifications of a user, newest first. Without a status filter,
    /// deleted notifications are excluded.
    async fn list(
        &self,
        user_id: &str,
        status: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Notification>, usize), RepositoryError>;

    async fn count_unread(&self, user_id: &str) -> Result<usize, RepositoryError>;

    /// Mark one notification read; returns the updated row
    async fn mark_read(&self, id: &str, at: DateTime<Utc>) -> Result<Option<Notification>, RepositoryError>;

    /// Mark every unread notification of a user read; returns how many changed
    async fn mark_all_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<usize, RepositoryError>;

    async fn set_status(&self, id: &str, status: &str) -> Result<bool, RepositoryError>;

    /// Remove every notification of a user
    async fn delete_for_user(&self, user_id: &str) -> Result<usize, RepositoryError>;

    async fn get_settings(&self, user_id: &str) -> Result<Option<NotificationSettings>, RepositoryError>;

    /// Insert or replace the settings row of a user
    async fn save_settings(&self, settings: &NotificationSettings) -> Result<NotificationSettings, RepositoryError>;
}

/// SQLite-backed notification repository
#[derive(Debug, Clone, Default)]
pub struct NotificationRepository {
    storage: DatabaseStorage,
}

impl NotificationRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        notification_type: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        priority: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        read_at: row.get(8)?,
        related_entity_id: row.get(9)?,
        related_entity_type: row.get(10)?,
        payload: json_column(row, 11)?,
        action_url: row.get(12)?,
    })
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        debug!("Storing notification: id={}, user={}", notification.id, notification.user_id);
        let conn = self.storage.connection()?;

        conn.execute(
            &format!(
                "INSERT INTO notifications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                NOTIFICATION_COLUMNS
            ),
            params![
                notification.id,
                notification.user_id,
                notification.notification_type,
                notification.title,
                notification.message,
                notification.priority,
                notification.status,
                notification.created_at,
                notification.read_at,
                notification.related_entity_id,
                notification.related_entity_type,
                to_json(&notification.payload)?,
                notification.action_url,
            ],
        ).map_err(RepositoryError::from_write)?;

        Ok(notification)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Notification>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM notifications WHERE id = ?1", NOTIFICATION_COLUMNS),
            [id],
            map_notification,
        ))
    }

    async fn list(
        &self,
        user_id: &str,
        status: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Notification>, usize), RepositoryError> {
        let conn = self.storage.connection()?;
        let condition = "user_id = ?1 AND ((?2 IS NULL AND status != 'deleted') OR status = ?2)";

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM notifications WHERE {}", condition),
            params![user_id, status],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notifications WHERE {} ORDER BY created_at DESC LIMIT ?3 OFFSET ?4",
            NOTIFICATION_COLUMNS, condition
        ))?;
        let notifications = stmt
            .query_map(params![user_id, status, limit as i64, offset as i64], map_notification)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((notifications, total as usize))
    }

    async fn count_unread(&self, user_id: &str) -> Result<usize, RepositoryError> {
        let conn = self.storage.connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND status = 'unread'",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn mark_read(&self, id: &str, at: DateTime<Utc>) -> Result<Option<Notification>, RepositoryError> {
        let conn = self.storage.connection()?;
        conn.execute(
            "UPDATE notifications SET status = 'read', read_at = COALESCE(read_at, ?2)
             WHERE id = ?1 AND status = 'unread'",
            params![id, at],
        )?;
        optional(conn.query_row(
            &format!("SELECT {} FROM notifications WHERE id = ?1", NOTIFICATION_COLUMNS),
            [id],
            map_notification,
        ))
    }

    async fn mark_all_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE notifications SET status = 'read', read_at = ?2 WHERE user_id = ?1 AND status = 'unread'",
            params![user_id, at],
        )?;
        Ok(updated)
    }

    async fn set_status(&self, id: &str, status: &str) -> Result<bool, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute("UPDATE notifications SET status = ?2 WHERE id = ?1", params![id, status])?;
        Ok(updated > 0)
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<usize, RepositoryError> {
        let conn = self.storage.connection()?;
        let deleted = conn.execute("DELETE FROM notifications WHERE user_id = ?1", [user_id])?;
        Ok(deleted)
    }

    async fn get_settings(&self, user_id: &str) -> Result<Option<NotificationSettings>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            "SELECT user_id, master_enabled, type_preferences, quiet_hours_enabled, quiet_hours_start,
                quiet_hours_end, updated_at
             FROM notification_settings WHERE user_id = ?1",
            [user_id],
            |row| {
                Ok(NotificationSettings {
                    user_id: row.get(0)?,
                    master_enabled: row.get(1)?,
                    type_preferences: json_column(row, 2)?,
                    quiet_hours_enabled: row.get(3)?,
                    quiet_hours_start: row.get(4)?,
                    quiet_hours_end: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        ))
    }

    async fn save_settings(&self, settings: &NotificationSettings) -> Result<NotificationSettings, RepositoryError> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO notification_settings
                (user_id, master_enabled, type_preferences, quiet_hours_enabled, quiet_hours_start, quiet_hours_end, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
                master_enabled = excluded.master_enabled,
                type_preferences = excluded.type_preferences,
                quiet_hours_enabled = excluded.quiet_hours_enabled,
                quiet_hours_start = excluded.quiet_hours_start,
                quiet_hours_end = excluded.quiet_hours_end,
                updated_at = excluded.updated_at",
            params![
                settings.user_id,
                settings.master_enabled,
                to_json(&settings.type_preferences)?,
                settings.quiet_hours_enabled,
                settings.quiet_hours_start,
                settings.quiet_hours_end,
                settings.updated_at,
            ],
        ).map_err(RepositoryError::from_write)?;
        Ok(settings.clone())
    }
}
