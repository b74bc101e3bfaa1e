use chrono::NaiveDate;
use rusqlite::{params, Row};
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::reminder::Reminder;
use super::errors::RepositoryError;
use super::storage::{optional, DatabaseStorage};

const REMINDER_COLUMNS: &str = "id, user_id, message, time_of_day, is_active, last_sent_on, created_at, updated_at";

/// Repository trait for hydration reminders
#[async_trait]
pub trait ReminderRepositoryTrait {
    async fn create(&self, reminder: Reminder) -> Result<Reminder, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Reminder>, RepositoryError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Reminder>, RepositoryError>;

    async fn update(&self, reminder: &Reminder) -> Result<Reminder, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Active reminders set for `time_of_day` that were not sent on `today`
    async fn list_due(&self, time_of_day: &str, today: NaiveDate) -> Result<Vec<Reminder>, RepositoryError>;

    async fn mark_sent(&self, id: &str, day: NaiveDate) -> Result<(), RepositoryError>;
}

/// SQLite-backed reminder repository
#[derive(Debug, Clone, Default)]
pub struct ReminderRepository {
    storage: DatabaseStorage,
}

impl ReminderRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_reminder(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message: row.get(2)?,
        time_of_day: row.get(3)?,
        is_active: row.get(4)?,
        last_sent_on: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[async_trait]
impl ReminderRepositoryTrait for ReminderRepository {
    async fn create(&self, reminder: Reminder) -> Result<Reminder, RepositoryError> {
        debug!("Storing reminder: id={}", reminder.id);
        let conn = self.storage.connection()?;
        conn.execute(
            &format!("INSERT INTO reminders ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", REMINDER_COLUMNS),
            params![
                reminder.id,
                reminder.user_id,
                reminder.message,
                reminder.time_of_day,
                reminder.is_active,
                reminder.last_sent_on,
                reminder.created_at,
                reminder.updated_at,
            ],
        ).map_err(RepositoryError::from_write)?;
        Ok(reminder)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Reminder>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM reminders WHERE id = ?1", REMINDER_COLUMNS),
            [id],
            map_reminder,
        ))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Reminder>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reminders WHERE user_id = ?1 ORDER BY time_of_day",
            REMINDER_COLUMNS
        ))?;
        let reminders = stmt.query_map([user_id], map_reminder)?.collect::<Result<Vec<_>, _>>()?;
        Ok(reminders)
    }

    async fn update(&self, reminder: &Reminder) -> Result<Reminder, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE reminders SET message = ?2, time_of_day = ?3, is_active = ?4, updated_at = ?5 WHERE id = ?1",
            params![reminder.id, reminder.message, reminder.time_of_day, reminder.is_active, reminder.updated_at],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("reminder {}", reminder.id)));
        }
        Ok(reminder.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.storage.connection()?;
        Ok(conn.execute("DELETE FROM reminders WHERE id = ?1", [id])? > 0)
    }

    async fn list_due(&self, time_of_day: &str, today: NaiveDate) -> Result<Vec<Reminder>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reminders
             WHERE is_active = 1 AND time_of_day = ?1 AND (last_sent_on IS NULL OR last_sent_on < ?2)",
            REMINDER_COLUMNS
        ))?;
        let reminders = stmt
            .query_map(params![time_of_day, today], map_reminder)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reminders)
    }

    async fn mark_sent(&self, id: &str, day: NaiveDate) -> Result<(), RepositoryError> {
        let conn = self.storage.connection()?;
        conn.execute("UPDATE reminders SET last_sent_on = ?2 WHERE id = ?1", params![id, day])?;
        Ok(())
    }
}
