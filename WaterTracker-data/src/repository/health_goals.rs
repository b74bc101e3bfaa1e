use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::health_goal::{GoalAchievement, GoalProgress, HealthGoal};
use super::errors::RepositoryError;
use super::storage::{json_column, optional, to_json, DatabaseStorage};

const GOAL_COLUMNS: &str = "id, user_id, name, description, goal_type, target_value, current_value, unit, \
    frequency, priority, difficulty, status, start_date, target_date, motivation, tags, milestones, \
    created_at, updated_at, completed_at, deleted_at";

/// Repository trait for health goals, their progress entries and milestones
#[async_trait]
pub trait HealthGoalRepositoryTrait {
    async fn create(&self, goal: HealthGoal) -> Result<HealthGoal, RepositoryError>;

    /// Get a goal that has not been soft-deleted
    async fn get_by_id(&self, id: &str) -> Result<Option<HealthGoal>, RepositoryError>;

    /// Goals of a user, optionally filtered by status, newest first
    async fn list_for_user(&self, user_id: &str, status: Option<&str>) -> Result<Vec<HealthGoal>, RepositoryError>;

    /// Persist every mutable column of a goal
    async fn update(&self, goal: &HealthGoal) -> Result<HealthGoal, RepositoryError>;

    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<bool, RepositoryError>;

    async fn soft_delete_for_user(&self, user_id: &str, at: DateTime<Utc>) -> Result<usize, RepositoryError>;

    /// Active goals whose target date is before `today`
    async fn list_overdue(&self, today: NaiveDate) -> Result<Vec<HealthGoal>, RepositoryError>;

    async fn add_progress(&self, entry: GoalProgress) -> Result<GoalProgress, RepositoryError>;

    /// Progress entries of a goal, oldest first
    async fn progress_for_goal(&self, goal_id: &str) -> Result<Vec<GoalProgress>, RepositoryError>;

    async fn add_achievement(&self, achievement: GoalAchievement) -> Result<GoalAchievement, RepositoryError>;

    /// Milestone achievements of a user, newest first
    async fn achievements_for_user(&self, user_id: &str) -> Result<Vec<GoalAchievement>, RepositoryError>;
}

/// SQLite-backed goal repository
#[derive(Debug, Clone, Default)]
pub struct HealthGoalRepository {
    storage: DatabaseStorage,
}

impl HealthGoalRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_goal(row: &Row<'_>) -> rusqlite::Result<HealthGoal> {
    Ok(HealthGoal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        goal_type: row.get(4)?,
        target_value: row.get(5)?,
        current_value: row.get(6)?,
        unit: row.get(7)?,
        frequency: row.get(8)?,
        priority: row.get(9)?,
        difficulty: row.get(10)?,
        status: row.get(11)?,
        start_date: row.get(12)?,
        target_date: row.get(13)?,
        motivation: row.get(14)?,
        tags: json_column(row, 15)?,
        milestones: json_column(row, 16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
        completed_at: row.get(19)?,
        deleted_at: row.get(20)?,
    })
}

fn map_progress(row: &Row<'_>) -> rusqlite::Result<GoalProgress> {
    Ok(GoalProgress {
        id: row.get(0)?,
        goal_id: row.get(1)?,
        user_id: row.get(2)?,
        value: row.get(3)?,
        notes: row.get(4)?,
        recorded_at: row.get(5)?,
    })
}

#[async_trait]
impl HealthGoalRepositoryTrait for HealthGoalRepository {
    async fn create(&self, goal: HealthGoal) -> Result<HealthGoal, RepositoryError> {
        debug!("Storing health goal in database: id={}", goal.id);
        let conn = self.storage.connection()?;

        conn.execute(
            &format!(
                "INSERT INTO health_goals ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
                GOAL_COLUMNS
            ),
            params![
                goal.id,
                goal.user_id,
                goal.name,
                goal.description,
                goal.goal_type,
                goal.target_value,
                goal.current_value,
                goal.unit,
                goal.frequency,
                goal.priority,
                goal.difficulty,
                goal.status,
                goal.start_date,
                goal.target_date,
                goal.motivation,
                to_json(&goal.tags)?,
                to_json(&goal.milestones)?,
                goal.created_at,
                goal.updated_at,
                goal.completed_at,
                goal.deleted_at,
            ],
        ).map_err(RepositoryError::from_write)?;

        Ok(goal)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<HealthGoal>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM health_goals WHERE id = ?1 AND deleted_at IS NULL", GOAL_COLUMNS),
            [id],
            map_goal,
        ))
    }

    async fn list_for_user(&self, user_id: &str, status: Option<&str>) -> Result<Vec<HealthGoal>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM health_goals
             WHERE user_id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC",
            GOAL_COLUMNS
        ))?;
        let goals = stmt
            .query_map(params![user_id, status], map_goal)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    async fn update(&self, goal: &HealthGoal) -> Result<HealthGoal, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE health_goals SET name = ?2, description = ?3, target_value = ?4, current_value = ?5,
                priority = ?6, status = ?7, target_date = ?8, motivation = ?9, tags = ?10, milestones = ?11,
                updated_at = ?12, completed_at = ?13
             WHERE id = ?1 AND deleted_at IS NULL",
            params![
                goal.id,
                goal.name,
                goal.description,
                goal.target_value,
                goal.current_value,
                goal.priority,
                goal.status,
                goal.target_date,
                goal.motivation,
                to_json(&goal.tags)?,
                to_json(&goal.milestones)?,
                goal.updated_at,
                goal.completed_at,
            ],
        ).map_err(RepositoryError::from_write)?;

        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("health goal {}", goal.id)));
        }
        Ok(goal.clone())
    }

    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE health_goals SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id, at],
        )?;
        Ok(updated > 0)
    }

    async fn soft_delete_for_user(&self, user_id: &str, at: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE health_goals SET deleted_at = ?2, updated_at = ?2 WHERE user_id = ?1 AND deleted_at IS NULL",
            params![user_id, at],
        )?;
        Ok(updated)
    }

    async fn list_overdue(&self, today: NaiveDate) -> Result<Vec<HealthGoal>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM health_goals WHERE status = 'active' AND deleted_at IS NULL AND target_date < ?1",
            GOAL_COLUMNS
        ))?;
        let goals = stmt.query_map([today], map_goal)?.collect::<Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    async fn add_progress(&self, entry: GoalProgress) -> Result<GoalProgress, RepositoryError> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO goal_progress (id, goal_id, user_id, value, notes, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![entry.id, entry.goal_id, entry.user_id, entry.value, entry.notes, entry.recorded_at],
        ).map_err(RepositoryError::from_write)?;
        Ok(entry)
    }

    async fn progress_for_goal(&self, goal_id: &str) -> Result<Vec<GoalProgress>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, goal_id, user_id, value, notes, recorded_at FROM goal_progress
             WHERE goal_id = ?1 ORDER BY recorded_at ASC",
        )?;
        let entries = stmt.query_map([goal_id], map_progress)?.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn add_achievement(&self, achievement: GoalAchievement) -> Result<GoalAchievement, RepositoryError> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO goal_achievements (id, user_id, goal_id, milestone_name, points, message, earned_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                achievement.id,
                achievement.user_id,
                achievement.goal_id,
                achievement.milestone_name,
                achievement.points,
                achievement.message,
                achievement.earned_at,
            ],
        ).map_err(RepositoryError::from_write)?;
        Ok(achievement)
    }

    async fn achievements_for_user(&self, user_id: &str) -> Result<Vec<GoalAchievement>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, goal_id, milestone_name, points, message, earned_at FROM goal_achievements
             WHERE user_id = ?1 ORDER BY earned_at DESC",
        )?;
        let achievements = stmt
            .query_map([user_id], |row| {
                Ok(GoalAchievement {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    goal_id: row.get(2)?,
                    milestone_name: row.get(3)?,
                    points: row.get(4)?,
                    message: row.get(5)?,
                    earned_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(achievements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;
    use crate::database::create_in_memory_pool;
    use crate::repository::users::tests::sample_user;
    use crate::repository::users::{UserRepository, UserRepositoryTrait};

    fn sample_goal(user_id: &str, target_date: NaiveDate) -> HealthGoal {
        let now = Utc::now();
        HealthGoal {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: "Drink more".to_string(),
            description: None,
            goal_type: "daily_hydration".to_string(),
            target_value: 2000.0,
            current_value: 0.0,
            unit: "ml".to_string(),
            frequency: "daily".to_string(),
            priority: "medium".to_string(),
            difficulty: 2,
            status: "active".to_string(),
            start_date: now.date_naive(),
            target_date,
            motivation: None,
            tags: json!(["hydration"]),
            milestones: json!([]),
            created_at: now,
            updated_at: now,
            completed_at: None,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_goal_round_trip_and_status_filter() {
        let pool = create_in_memory_pool().unwrap();
        let users = UserRepository::with_pool(pool.clone());
        let goals = HealthGoalRepository::with_pool(pool);
        let user = users.create(sample_user("fay")).await.unwrap();

        let today = Utc::now().date_naive();
        let goal = goals.create(sample_goal(&user.id, today + Duration::days(30))).await.unwrap();
        assert_eq!(goals.get_by_id(&goal.id).await.unwrap().unwrap(), goal);

        assert_eq!(goals.list_for_user(&user.id, Some("active")).await.unwrap().len(), 1);
        assert!(goals.list_for_user(&user.id, Some("paused")).await.unwrap().is_empty());
        assert_eq!(goals.list_for_user(&user.id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_overdue() {
        let pool = create_in_memory_pool().unwrap();
        let users = UserRepository::with_pool(pool.clone());
        let goals = HealthGoalRepository::with_pool(pool);
        let user = users.create(sample_user("gus")).await.unwrap();

        let today = Utc::now().date_naive();
        goals.create(sample_goal(&user.id, today - Duration::days(1))).await.unwrap();
        goals.create(sample_goal(&user.id, today + Duration::days(1))).await.unwrap();

        assert_eq!(goals.list_overdue(today).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_entries_are_ordered() {
        let pool = create_in_memory_pool().unwrap();
        let users = UserRepository::with_pool(pool.clone());
        let goals = HealthGoalRepository::with_pool(pool);
        let user = users.create(sample_user("hal")).await.unwrap();
        let goal = goals.create(sample_goal(&user.id, Utc::now().date_naive() + Duration::days(5))).await.unwrap();

        let now = Utc::now();
        for (offset, value) in [(2, 100.0), (0, 300.0), (1, 200.0)] {
            goals.add_progress(GoalProgress {
                id: Uuid::new_v4().to_string(),
                goal_id: goal.id.clone(),
                user_id: user.id.clone(),
                value,
                notes: None,
                recorded_at: now - Duration::hours(offset),
            }).await.unwrap();
        }

        let values: Vec<f64> = goals.progress_for_goal(&goal.id).await.unwrap().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![100.0, 200.0, 300.0]);
    }
}
