use chrono::{DateTime, Utc};
use rusqlite::{params, Row, TransactionBehavior};
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::user::{SiteStats, User, UserProgressUpdate};
use crate::models::social::LeaderboardRow;
use super::errors::RepositoryError;
use super::storage::{optional, DatabaseStorage};

const USER_COLUMNS: &str = "id, username, email, role, is_active, daily_goal_ml, current_streak, \
    longest_streak, last_log_date, xp, points, level, created_at, updated_at, deleted_at";

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepositoryTrait {
    /// Insert a new user
    async fn create(&self, user: User) -> Result<User, RepositoryError>;

    /// Get an active (not soft-deleted) user by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    /// Get an active user by username, case-insensitively
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// List users that are not soft-deleted, with the total count
    async fn list(&self, offset: usize, limit: usize) -> Result<(Vec<User>, usize), RepositoryError>;

    /// Persist the editable fields of a user
    async fn update(&self, user: &User) -> Result<User, RepositoryError>;

    /// Recompute the gamification counters of an active user from the current
    /// row and write them back. The read and the write share one immediate
    /// transaction, so concurrent callers never overwrite each other.
    async fn apply_progress(
        &self,
        id: &str,
        change: &(dyn for<'u> Fn(&'u User) -> UserProgressUpdate + Send + Sync),
    ) -> Result<User, RepositoryError>;

    /// Soft-delete a user. Returns false when no active user matched.
    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// Active users ordered by points, then XP
    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardRow>, RepositoryError>;

    /// Site-wide counters; `day_start` marks the beginning of "today"
    async fn site_stats(&self, day_start: DateTime<Utc>) -> Result<SiteStats, RepositoryError>;
}

/// SQLite-backed user repository
#[derive(Debug, Clone, Default)]
pub struct UserRepository {
    storage: DatabaseStorage,
}

impl UserRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        is_active: row.get(4)?,
        daily_goal_ml: row.get(5)?,
        current_streak: row.get(6)?,
        longest_streak: row.get(7)?,
        last_log_date: row.get(8)?,
        xp: row.get(9)?,
        points: row.get(10)?,
        level: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        deleted_at: row.get(14)?,
    })
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        debug!("Storing user in database: id={}", user.id);
        let conn = self.storage.connection()?;

        conn.execute(
            &format!("INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)", USER_COLUMNS),
            params![
                user.id,
                user.username,
                user.email,
                user.role,
                user.is_active,
                user.daily_goal_ml,
                user.current_streak,
                user.longest_streak,
                user.last_log_date,
                user.xp,
                user.points,
                user.level,
                user.created_at,
                user.updated_at,
                user.deleted_at,
            ],
        ).map_err(RepositoryError::from_write)?;

        Ok(user)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        debug!("Getting user by ID from database: id={}", id);
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1 AND deleted_at IS NULL", USER_COLUMNS),
            [id],
            map_user,
        ))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM users WHERE username = ?1 COLLATE NOCASE AND deleted_at IS NULL", USER_COLUMNS),
            [username],
            map_user,
        ))
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<(Vec<User>, usize), RepositoryError> {
        let conn = self.storage.connection()?;

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY created_at ASC LIMIT ?1 OFFSET ?2",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map(params![limit as i64, offset as i64], map_user)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, total as usize))
    }

    async fn update(&self, user: &User) -> Result<User, RepositoryError> {
        let conn = self.storage.connection()?;

        let updated = conn.execute(
            "UPDATE users SET email = ?2, role = ?3, is_active = ?4, daily_goal_ml = ?5, updated_at = ?6
             WHERE id = ?1 AND deleted_at IS NULL",
            params![user.id, user.email, user.role, user.is_active, user.daily_goal_ml, user.updated_at],
        ).map_err(RepositoryError::from_write)?;

        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("user {}", user.id)));
        }
        Ok(user.clone())
    }

    async fn apply_progress(
        &self,
        id: &str,
        change: &(dyn for<'u> Fn(&'u User) -> UserProgressUpdate + Send + Sync),
    ) -> Result<User, RepositoryError> {
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut user = optional(tx.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1 AND deleted_at IS NULL", USER_COLUMNS),
            [id],
            map_user,
        ))?
        .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))?;

        let progress = change(&user);
        let now = Utc::now();
        tx.execute(
            "UPDATE users SET xp = ?2, points = ?3, level = ?4, current_streak = ?5,
                longest_streak = ?6, last_log_date = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                id,
                progress.xp,
                progress.points,
                progress.level,
                progress.current_streak,
                progress.longest_streak,
                progress.last_log_date,
                now,
            ],
        )?;
        tx.commit()?;

        user.xp = progress.xp;
        user.points = progress.points;
        user.level = progress.level;
        user.current_streak = progress.current_streak;
        user.longest_streak = progress.longest_streak;
        user.last_log_date = progress.last_log_date;
        user.updated_at = now;
        Ok(user)
    }

    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE users SET is_active = 0, deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id, at],
        )?;
        Ok(updated > 0)
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardRow>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, points, xp, level, current_streak FROM users
             WHERE is_active = 1 AND deleted_at IS NULL
             ORDER BY points DESC, xp DESC, username ASC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok(LeaderboardRow {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    points: row.get(2)?,
                    xp: row.get(3)?,
                    level: row.get(4)?,
                    current_streak: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    async fn site_stats(&self, day_start: DateTime<Utc>) -> Result<SiteStats, RepositoryError> {
        let conn = self.storage.connection()?;
        let stats = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM users WHERE deleted_at IS NULL),
                (SELECT COUNT(*) FROM users WHERE deleted_at IS NULL AND is_active = 1),
                (SELECT COUNT(*) FROM users WHERE deleted_at IS NULL AND created_at >= ?1),
                (SELECT COUNT(*) FROM water_logs WHERE deleted_at IS NULL),
                (SELECT COALESCE(SUM(volume_ml), 0) FROM water_logs WHERE deleted_at IS NULL),
                (SELECT COUNT(*) FROM reminders WHERE is_active = 1)",
            [day_start],
            |row| {
                Ok(SiteStats {
                    total_users: row.get(0)?,
                    active_users: row.get(1)?,
                    new_users_today: row.get(2)?,
                    total_water_logs: row.get(3)?,
                    total_volume_ml: row.get(4)?,
                    active_reminders: row.get(5)?,
                })
            },
        )?;
        Ok(stats)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::create_in_memory_pool;
    use uuid::Uuid;

    pub(crate) fn sample_user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            role: "user".to_string(),
            is_active: true,
            daily_goal_ml: 2000,
            current_streak: 0,
            longest_streak: 0,
            last_log_date: None,
            xp: 0,
            points: 0,
            level: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let repo = UserRepository::with_pool(create_in_memory_pool().unwrap());
        let user = repo.create(sample_user("alice")).await.unwrap();

        let fetched = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched, user);

        let by_name = repo.get_by_username("ALICE").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let repo = UserRepository::with_pool(create_in_memory_pool().unwrap());
        repo.create(sample_user("bob")).await.unwrap();

        let mut duplicate = sample_user("Bob");
        duplicate.email = "other@example.com".to_string();
        let err = repo.create(duplicate).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_soft_deleted_user_is_hidden() {
        let repo = UserRepository::with_pool(create_in_memory_pool().unwrap());
        let user = repo.create(sample_user("carol")).await.unwrap();

        assert!(repo.soft_delete(&user.id, Utc::now()).await.unwrap());
        assert!(repo.get_by_id(&user.id).await.unwrap().is_none());
        assert!(!repo.soft_delete(&user.id, Utc::now()).await.unwrap());

        let (users, total) = repo.list(0, 10).await.unwrap();
        assert!(users.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_points() {
        let repo = UserRepository::with_pool(create_in_memory_pool().unwrap());
        let low = repo.create(sample_user("low")).await.unwrap();
        let high = repo.create(sample_user("high")).await.unwrap();

        fn add_points(points: i64) -> impl Fn(&User) -> UserProgressUpdate + Send + Sync {
            move |current: &User| UserProgressUpdate {
                xp: current.xp + 10,
                points: current.points + points,
                level: 1,
                current_streak: 1,
                longest_streak: 1,
                last_log_date: None,
            }
        }
        repo.apply_progress(&low.id, &add_points(5)).await.unwrap();
        repo.apply_progress(&high.id, &add_points(50)).await.unwrap();

        let board = repo.leaderboard(10).await.unwrap();
        assert_eq!(board[0].username, "high");
        assert_eq!(board[1].username, "low");
    }

    #[tokio::test]
    async fn test_apply_progress_builds_on_stored_counters() {
        let repo = UserRepository::with_pool(create_in_memory_pool().unwrap());
        let user = repo.create(sample_user("dora")).await.unwrap();

        let bump = |current: &User| UserProgressUpdate {
            xp: current.xp + 10,
            points: current.points + 5,
            level: current.level,
            current_streak: current.current_streak,
            longest_streak: current.longest_streak,
            last_log_date: current.last_log_date,
        };
        repo.apply_progress(&user.id, &bump).await.unwrap();
        let updated = repo.apply_progress(&user.id, &bump).await.unwrap();
        assert_eq!(updated.xp, 20);
        assert_eq!(updated.points, 10);

        let stored = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.xp, 20);

        assert!(repo.soft_delete(&user.id, Utc::now()).await.unwrap());
        let err = repo.apply_progress(&user.id, &bump).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
