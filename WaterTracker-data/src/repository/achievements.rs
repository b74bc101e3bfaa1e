use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use uuid::Uuid;
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::achievement::{AchievementDefinition, UserAchievement};
use super::errors::RepositoryError;
use super::storage::{json_column, optional, to_json, DatabaseStorage};

/// Repository trait for the achievement catalogue and user progress
#[async_trait]
pub trait AchievementRepositoryTrait {
    /// Insert a definition when its ID is not taken yet. Returns true when inserted.
    async fn insert_definition_if_absent(&self, definition: &AchievementDefinition) -> Result<bool, RepositoryError>;

    async fn list_definitions(&self) -> Result<Vec<AchievementDefinition>, RepositoryError>;

    async fn get_definition(&self, id: &str) -> Result<Option<AchievementDefinition>, RepositoryError>;

    /// Current stage a user holds for an achievement
    async fn get_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> Result<Option<UserAchievement>, RepositoryError>;

    /// Record that a user reached `stage`
    async fn set_stage(
        &self,
        user_id: &str,
        achievement_id: &str,
        stage: i64,
        at: DateTime<Utc>,
    ) -> Result<UserAchievement, RepositoryError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserAchievement>, RepositoryError>;
}

/// SQLite-backed achievement repository
#[derive(Debug, Clone, Default)]
pub struct AchievementRepository {
    storage: DatabaseStorage,
}

impl AchievementRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_definition(row: &Row<'_>) -> rusqlite::Result<AchievementDefinition> {
    Ok(AchievementDefinition {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        criteria_type: row.get(3)?,
        criteria_values: json_column(row, 4)?,
    })
}

fn map_user_achievement(row: &Row<'_>) -> rusqlite::Result<UserAchievement> {
    Ok(UserAchievement {
        id: row.get(0)?,
        user_id: row.get(1)?,
        achievement_id: row.get(2)?,
        stage: row.get(3)?,
        earned_at: row.get(4)?,
    })
}

#[async_trait]
impl AchievementRepositoryTrait for AchievementRepository {
    async fn insert_definition_if_absent(&self, definition: &AchievementDefinition) -> Result<bool, RepositoryError> {
        let conn = self.storage.connection()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO achievement_definitions (id, name, description, criteria_type, criteria_values)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                definition.id,
                definition.name,
                definition.description,
                definition.criteria_type,
                to_json(&definition.criteria_values)?,
            ],
        )?;
        if inserted > 0 {
            debug!("Seeded achievement definition: {}", definition.id);
        }
        Ok(inserted > 0)
    }

    async fn list_definitions(&self) -> Result<Vec<AchievementDefinition>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, criteria_type, criteria_values FROM achievement_definitions ORDER BY id",
        )?;
        let definitions = stmt.query_map([], map_definition)?.collect::<Result<Vec<_>, _>>()?;
        Ok(definitions)
    }

    async fn get_definition(&self, id: &str) -> Result<Option<AchievementDefinition>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            "SELECT id, name, description, criteria_type, criteria_values FROM achievement_definitions WHERE id = ?1",
            [id],
            map_definition,
        ))
    }

    async fn get_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> Result<Option<UserAchievement>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            "SELECT id, user_id, achievement_id, stage, earned_at FROM user_achievements
             WHERE user_id = ?1 AND achievement_id = ?2",
            params![user_id, achievement_id],
            map_user_achievement,
        ))
    }

    async fn set_stage(
        &self,
        user_id: &str,
        achievement_id: &str,
        stage: i64,
        at: DateTime<Utc>,
    ) -> Result<UserAchievement, RepositoryError> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO user_achievements (id, user_id, achievement_id, stage, earned_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, achievement_id) DO UPDATE SET stage = excluded.stage, earned_at = excluded.earned_at",
            params![Uuid::new_v4().to_string(), user_id, achievement_id, stage, at],
        ).map_err(RepositoryError::from_write)?;

        conn.query_row(
            "SELECT id, user_id, achievement_id, stage, earned_at FROM user_achievements
             WHERE user_id = ?1 AND achievement_id = ?2",
            params![user_id, achievement_id],
            map_user_achievement,
        ).map_err(RepositoryError::Sqlite)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserAchievement>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, achievement_id, stage, earned_at FROM user_achievements
             WHERE user_id = ?1 ORDER BY earned_at DESC",
        )?;
        let achievements = stmt.query_map([user_id], map_user_achievement)?.collect::<Result<Vec<_>, _>>()?;
        Ok(achievements)
    }
}
