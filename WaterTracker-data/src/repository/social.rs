use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Row};
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::social::{Activity, Friendship};
use super::errors::RepositoryError;
use super::storage::{json_column, optional, to_json, DatabaseStorage};

const FRIENDSHIP_COLUMNS: &str = "id, requester_id, addressee_id, status, created_at, updated_at";

/// Repository trait for friendships and the activity feed
#[async_trait]
pub trait SocialRepositoryTrait {
    async fn create_friendship(&self, friendship: Friendship) -> Result<Friendship, RepositoryError>;

    async fn get_friendship(&self, id: &str) -> Result<Option<Friendship>, RepositoryError>;

    /// Friendship between two users in either direction
    async fn find_between(&self, a: &str, b: &str) -> Result<Option<Friendship>, RepositoryError>;

    async fn update_status(&self, id: &str, status: &str, at: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// Friendships involving a user, optionally filtered by status
    async fn list_for_user(&self, user_id: &str, status: Option<&str>) -> Result<Vec<Friendship>, RepositoryError>;

    async fn record_activity(&self, activity: Activity) -> Result<Activity, RepositoryError>;

    /// Activities of the given users, newest first
    async fn feed(&self, user_ids: &[String], limit: usize) -> Result<Vec<Activity>, RepositoryError>;
}

/// SQLite-backed social repository
#[derive(Debug, Clone, Default)]
pub struct SocialRepository {
    storage: DatabaseStorage,
}

impl SocialRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_friendship(row: &Row<'_>) -> rusqlite::Result<Friendship> {
    Ok(Friendship {
        id: row.get(0)?,
        requester_id: row.get(1)?,
        addressee_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[async_trait]
impl SocialRepositoryTrait for SocialRepository {
    async fn create_friendship(&self, friendship: Friendship) -> Result<Friendship, RepositoryError> {
        let conn = self.storage.connection()?;
        conn.execute(
            &format!("INSERT INTO friendships ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", FRIENDSHIP_COLUMNS),
            params![
                friendship.id,
                friendship.requester_id,
                friendship.addressee_id,
                friendship.status,
                friendship.created_at,
                friendship.updated_at,
            ],
        ).map_err(RepositoryError::from_write)?;
        Ok(friendship)
    }

    async fn get_friendship(&self, id: &str) -> Result<Option<Friendship>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM friendships WHERE id = ?1", FRIENDSHIP_COLUMNS),
            [id],
            map_friendship,
        ))
    }

    async fn find_between(&self, a: &str, b: &str) -> Result<Option<Friendship>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!(
                "SELECT {} FROM friendships
                 WHERE (requester_id = ?1 AND addressee_id = ?2) OR (requester_id = ?2 AND addressee_id = ?1)",
                FRIENDSHIP_COLUMNS
            ),
            params![a, b],
            map_friendship,
        ))
    }

    async fn update_status(&self, id: &str, status: &str, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE friendships SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status, at],
        )?;
        Ok(updated > 0)
    }

    async fn list_for_user(&self, user_id: &str, status: Option<&str>) -> Result<Vec<Friendship>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM friendships
             WHERE (requester_id = ?1 OR addressee_id = ?1) AND (?2 IS NULL OR status = ?2)
             ORDER BY updated_at DESC",
            FRIENDSHIP_COLUMNS
        ))?;
        let friendships = stmt
            .query_map(params![user_id, status], map_friendship)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(friendships)
    }

    async fn record_activity(&self, activity: Activity) -> Result<Activity, RepositoryError> {
        debug!("Recording activity {} for user {}", activity.activity_type, activity.user_id);
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO activities (id, user_id, activity_type, data, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                activity.id,
                activity.user_id,
                activity.activity_type,
                to_json(&activity.data)?,
                activity.created_at,
            ],
        ).map_err(RepositoryError::from_write)?;
        Ok(activity)
    }

    async fn feed(&self, user_ids: &[String], limit: usize) -> Result<Vec<Activity>, RepositoryError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.storage.connection()?;
        let placeholders: Vec<String> = (1..=user_ids.len()).map(|i| format!("?{}", i)).collect();
        let mut values: Vec<&dyn ToSql> = user_ids.iter().map(|id| id as &dyn ToSql).collect();
        let limit = limit as i64;
        values.push(&limit);

        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, activity_type, data, created_at FROM activities
             WHERE user_id IN ({}) ORDER BY created_at DESC LIMIT ?{}",
            placeholders.join(", "),
            values.len()
        ))?;

        let activities = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(Activity {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    activity_type: row.get(2)?,
                    data: json_column(row, 3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(activities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;
    use crate::database::create_in_memory_pool;
    use crate::repository::users::tests::sample_user;
    use crate::repository::users::{UserRepository, UserRepositoryTrait};

    #[tokio::test]
    async fn test_friendship_lookup_is_symmetric() {
        let pool = create_in_memory_pool().unwrap();
        let users = UserRepository::with_pool(pool.clone());
        let repo = SocialRepository::with_pool(pool);
        let a = users.create(sample_user("amy")).await.unwrap();
        let b = users.create(sample_user("ben")).await.unwrap();

        let now = Utc::now();
        let friendship = repo.create_friendship(Friendship {
            id: Uuid::new_v4().to_string(),
            requester_id: a.id.clone(),
            addressee_id: b.id.clone(),
            status: "pending".to_string(),
            created_at: now,
            updated_at: now,
        }).await.unwrap();

        let found = repo.find_between(&b.id, &a.id).await.unwrap().unwrap();
        assert_eq!(found.id, friendship.id);

        assert!(repo.update_status(&friendship.id, "accepted", Utc::now()).await.unwrap());
        assert_eq!(repo.list_for_user(&b.id, Some("accepted")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_feed_only_includes_requested_users() {
        let pool = create_in_memory_pool().unwrap();
        let users = UserRepository::with_pool(pool.clone());
        let repo = SocialRepository::with_pool(pool);
        let a = users.create(sample_user("cal")).await.unwrap();
        let b = users.create(sample_user("dee")).await.unwrap();

        for user in [&a, &b] {
            repo.record_activity(Activity {
                id: Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                activity_type: "logged_water".to_string(),
                data: json!({"volume_ml": 250}),
                created_at: Utc::now(),
            }).await.unwrap();
        }

        let feed = repo.feed(&[a.id.clone()], 10).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].user_id, a.id);
        assert!(repo.feed(&[], 10).await.unwrap().is_empty());
    }
}
