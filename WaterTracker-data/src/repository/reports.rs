use rusqlite::{params, Row};
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::report::Report;
use super::errors::RepositoryError;
use super::storage::{json_column, optional, to_json, DatabaseStorage};

const REPORT_COLUMNS: &str = "id, user_id, report_type, title, period_start, period_end, status, content, created_at";

/// Repository trait for generated reports
#[async_trait]
pub trait ReportRepositoryTrait {
    async fn create(&self, report: Report) -> Result<Report, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Report>, RepositoryError>;

    /// Reports of a user, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Report>, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// SQLite-backed report repository
#[derive(Debug, Clone, Default)]
pub struct ReportRepository {
    storage: DatabaseStorage,
}

impl ReportRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_report(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        user_id: row.get(1)?,
        report_type: row.get(2)?,
        title: row.get(3)?,
        period_start: row.get(4)?,
        period_end: row.get(5)?,
        status: row.get(6)?,
        content: json_column(row, 7)?,
        created_at: row.get(8)?,
    })
}

#[async_trait]
impl ReportRepositoryTrait for ReportRepository {
    async fn create(&self, report: Report) -> Result<Report, RepositoryError> {
        debug!("Storing report: id={}, type={}", report.id, report.report_type);
        let conn = self.storage.connection()?;
        conn.execute(
            &format!("INSERT INTO reports ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)", REPORT_COLUMNS),
            params![
                report.id,
                report.user_id,
                report.report_type,
                report.title,
                report.period_start,
                report.period_end,
                report.status,
                to_json(&report.content)?,
                report.created_at,
            ],
        ).map_err(RepositoryError::from_write)?;
        Ok(report)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Report>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS),
            [id],
            map_report,
        ))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Report>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reports WHERE user_id = ?1 ORDER BY created_at DESC",
            REPORT_COLUMNS
        ))?;
        let reports = stmt.query_map([user_id], map_report)?.collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.storage.connection()?;
        Ok(conn.execute("DELETE FROM reports WHERE id = ?1", [id])? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;
    use crate::database::create_in_memory_pool;
    use crate::repository::users::tests::sample_user;
    use crate::repository::users::{UserRepository, UserRepositoryTrait};

    #[tokio::test]
    async fn test_report_round_trip_and_delete() {
        let pool = create_in_memory_pool().unwrap();
        let users = UserRepository::with_pool(pool.clone());
        let repo = ReportRepository::with_pool(pool);
        let user = users.create(sample_user("mia")).await.unwrap();

        let today = Utc::now().date_naive();
        let report = Report {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            report_type: "hydration_summary".to_string(),
            title: "Hydration Summary".to_string(),
            period_start: today,
            period_end: today,
            status: "completed".to_string(),
            content: json!({"sections": {}}),
            created_at: Utc::now(),
        };
        let stored = assert_ok!(repo.create(report.clone()).await);
        assert_eq!(repo.get_by_id(&stored.id).await.unwrap(), Some(report));

        assert!(assert_ok!(repo.delete(&stored.id).await));
        assert!(repo.list_for_user(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_for_unknown_user_fails() {
        let repo = ReportRepository::with_pool(create_in_memory_pool().unwrap());
        let today = Utc::now().date_naive();
        assert_err!(repo.create(Report {
            id: Uuid::new_v4().to_string(),
            user_id: "nobody".to_string(),
            report_type: "goal_progress".to_string(),
            title: "Goal Progress".to_string(),
            period_start: today,
            period_end: today,
            status: "completed".to_string(),
            content: json!({}),
            created_at: Utc::now(),
        }).await);
    }
}
