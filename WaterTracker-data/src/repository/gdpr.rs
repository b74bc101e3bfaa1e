use rusqlite::{params, Row};
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::gdpr::GdprRequest;
use super::errors::RepositoryError;
use super::storage::{json_column, optional, optional_json_column, to_json, DatabaseStorage};

const GDPR_COLUMNS: &str = "id, user_id, request_type, data_categories, reason, status, deadline, \
    submitted_at, processed_at, completed_at, response_data, notes";

/// Repository trait for data-subject requests
#[async_trait]
pub trait GdprRepositoryTrait {
    async fn create(&self, request: GdprRequest) -> Result<GdprRequest, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<GdprRequest>, RepositoryError>;

    /// Requests of a user, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<GdprRequest>, RepositoryError>;

    /// Every request, optionally filtered by status, oldest deadline first
    async fn list_all(&self, status: Option<&str>) -> Result<Vec<GdprRequest>, RepositoryError>;

    /// Persist status, timestamps, response and notes
    async fn update(&self, request: &GdprRequest) -> Result<GdprRequest, RepositoryError>;
}

/// SQLite-backed GDPR request repository
#[derive(Debug, Clone, Default)]
pub struct GdprRepository {
    storage: DatabaseStorage,
}

impl GdprRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_request(row: &Row<'_>) -> rusqlite::Result<GdprRequest> {
    Ok(GdprRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        request_type: row.get(2)?,
        data_categories: json_column(row, 3)?,
        reason: row.get(4)?,
        status: row.get(5)?,
        deadline: row.get(6)?,
        submitted_at: row.get(7)?,
        processed_at: row.get(8)?,
        completed_at: row.get(9)?,
        response_data: optional_json_column(row, 10)?,
        notes: json_column(row, 11)?,
    })
}

#[async_trait]
impl GdprRepositoryTrait for GdprRepository {
    async fn create(&self, request: GdprRequest) -> Result<GdprRequest, RepositoryError> {
        debug!("Storing GDPR request: id={}, type={}", request.id, request.request_type);
        let conn = self.storage.connection()?;
        let response_data = request.response_data.as_ref().map(|v| to_json(v)).transpose()?;
        conn.execute(
            &format!("INSERT INTO gdpr_requests ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)", GDPR_COLUMNS),
            params![
                request.id,
                request.user_id,
                request.request_type,
                to_json(&request.data_categories)?,
                request.reason,
                request.status,
                request.deadline,
                request.submitted_at,
                request.processed_at,
                request.completed_at,
                response_data,
                to_json(&request.notes)?,
            ],
        ).map_err(RepositoryError::from_write)?;
        Ok(request)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<GdprRequest>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM gdpr_requests WHERE id = ?1", GDPR_COLUMNS),
            [id],
            map_request,
        ))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<GdprRequest>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM gdpr_requests WHERE user_id = ?1 ORDER BY submitted_at DESC",
            GDPR_COLUMNS
        ))?;
        let requests = stmt.query_map([user_id], map_request)?.collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    async fn list_all(&self, status: Option<&str>) -> Result<Vec<GdprRequest>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM gdpr_requests WHERE (?1 IS NULL OR status = ?1) ORDER BY deadline ASC",
            GDPR_COLUMNS
        ))?;
        let requests = stmt.query_map([status], map_request)?.collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    async fn update(&self, request: &GdprRequest) -> Result<GdprRequest, RepositoryError> {
        let conn = self.storage.connection()?;
        let response_data = request.response_data.as_ref().map(|v| to_json(v)).transpose()?;
        let updated = conn.execute(
            "UPDATE gdpr_requests SET status = ?2, processed_at = ?3, completed_at = ?4, response_data = ?5, notes = ?6
             WHERE id = ?1",
            params![
                request.id,
                request.status,
                request.processed_at,
                request.completed_at,
                response_data,
                to_json(&request.notes)?,
            ],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("GDPR request {}", request.id)));
        }
        Ok(request.clone())
    }
}
