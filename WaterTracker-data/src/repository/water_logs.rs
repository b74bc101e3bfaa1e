use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Row};
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::water_log::{DailyVolume, WaterLog, WaterLogFilter, WaterLogWithProduct};
use super::errors::RepositoryError;
use super::storage::{optional, DatabaseStorage};

const LOG_COLUMNS: &str = "l.id, l.user_id, l.water_id, l.volume_ml, l.drink_type, l.caffeine_mg, \
    l.logged_at, l.created_at, l.updated_at, l.deleted_at";

/// Repository trait for water intake logs
#[async_trait]
pub trait WaterLogRepositoryTrait {
    /// Insert a new log
    async fn create(&self, log: WaterLog) -> Result<WaterLog, RepositoryError>;

    /// Get a log that has not been soft-deleted
    async fn get_by_id(&self, id: &str) -> Result<Option<WaterLog>, RepositoryError>;

    /// Persist volume, drink details and timestamp changes
    async fn update(&self, log: &WaterLog) -> Result<WaterLog, RepositoryError>;

    /// Soft-delete a log. Returns false when no live log matched.
    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// Soft-delete every log of a user, returning how many were affected
    async fn soft_delete_for_user(&self, user_id: &str, at: DateTime<Utc>) -> Result<usize, RepositoryError>;

    /// Filtered, paginated listing, newest first, with the total match count
    async fn find(&self, filter: &WaterLogFilter) -> Result<(Vec<WaterLog>, usize), RepositoryError>;

    /// Per-day totals for a user in `[start, end)`
    async fn daily_volumes(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyVolume>, RepositoryError>;

    /// Lifetime log count and volume of a user
    async fn totals(&self, user_id: &str) -> Result<(i64, i64), RepositoryError>;

    /// Logs since a point in time, joined with product brand and packaging
    async fn with_products_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<WaterLogWithProduct>, RepositoryError>;
}

/// SQLite-backed water log repository
#[derive(Debug, Clone, Default)]
pub struct WaterLogRepository {
    storage: DatabaseStorage,
}

impl WaterLogRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_log(row: &Row<'_>) -> rusqlite::Result<WaterLog> {
    Ok(WaterLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        water_id: row.get(2)?,
        volume_ml: row.get(3)?,
        drink_type: row.get(4)?,
        caffeine_mg: row.get(5)?,
        logged_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        deleted_at: row.get(9)?,
    })
}

/// Build the WHERE clause shared by the listing and its count
fn filter_clause(filter: &WaterLogFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut conditions = vec!["l.deleted_at IS NULL".to_string()];
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(user_id) = &filter.user_id {
        values.push(Box::new(user_id.clone()));
        conditions.push(format!("l.user_id = ?{}", values.len()));
    }
    if let Some(start) = filter.start {
        values.push(Box::new(start));
        conditions.push(format!("l.logged_at >= ?{}", values.len()));
    }
    if let Some(end) = filter.end {
        values.push(Box::new(end));
        conditions.push(format!("l.logged_at <= ?{}", values.len()));
    }
    if let Some(min) = filter.min_volume {
        values.push(Box::new(min));
        conditions.push(format!("l.volume_ml >= ?{}", values.len()));
    }
    if let Some(max) = filter.max_volume {
        values.push(Box::new(max));
        conditions.push(format!("l.volume_ml <= ?{}", values.len()));
    }

    for (column, wanted) in [("p.brand_name", &filter.brand_names), ("p.packaging", &filter.packaging_types)] {
        if wanted.is_empty() {
            continue;
        }
        let mut placeholders = Vec::with_capacity(wanted.len());
        for value in wanted {
            values.push(Box::new(value.to_lowercase()));
            placeholders.push(format!("?{}", values.len()));
        }
        conditions.push(format!("LOWER({}) IN ({})", column, placeholders.join(", ")));
    }

    (conditions.join(" AND "), values)
}

#[async_trait]
impl WaterLogRepositoryTrait for WaterLogRepository {
    async fn create(&self, log: WaterLog) -> Result<WaterLog, RepositoryError> {
        debug!("Storing water log in database: id={}", log.id);
        let conn = self.storage.connection()?;

        conn.execute(
            "INSERT INTO water_logs
                (id, user_id, water_id, volume_ml, drink_type, caffeine_mg, logged_at, created_at, updated_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                log.id,
                log.user_id,
                log.water_id,
                log.volume_ml,
                log.drink_type,
                log.caffeine_mg,
                log.logged_at,
                log.created_at,
                log.updated_at,
                log.deleted_at,
            ],
        ).map_err(RepositoryError::from_write)?;

        Ok(log)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<WaterLog>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM water_logs l WHERE l.id = ?1 AND l.deleted_at IS NULL", LOG_COLUMNS),
            [id],
            map_log,
        ))
    }

    async fn update(&self, log: &WaterLog) -> Result<WaterLog, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE water_logs SET water_id = ?2, volume_ml = ?3, drink_type = ?4, caffeine_mg = ?5,
                logged_at = ?6, updated_at = ?7
             WHERE id = ?1 AND deleted_at IS NULL",
            params![
                log.id,
                log.water_id,
                log.volume_ml,
                log.drink_type,
                log.caffeine_mg,
                log.logged_at,
                log.updated_at,
            ],
        ).map_err(RepositoryError::from_write)?;

        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("water log {}", log.id)));
        }
        Ok(log.clone())
    }

    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE water_logs SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id, at],
        )?;
        Ok(updated > 0)
    }

    async fn soft_delete_for_user(&self, user_id: &str, at: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let conn = self.storage.connection()?;
        let updated = conn.execute(
            "UPDATE water_logs SET deleted_at = ?2, updated_at = ?2 WHERE user_id = ?1 AND deleted_at IS NULL",
            params![user_id, at],
        )?;
        Ok(updated)
    }

    async fn find(&self, filter: &WaterLogFilter) -> Result<(Vec<WaterLog>, usize), RepositoryError> {
        let conn = self.storage.connection()?;
        let (where_clause, mut values) = filter_clause(filter);
        let from = "FROM water_logs l LEFT JOIN water_products p ON p.id = l.water_id";

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) {} WHERE {}", from, where_clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let offset = filter.offset.unwrap_or(0) as i64;
        values.push(Box::new(limit));
        values.push(Box::new(offset));

        let sql = format!(
            "SELECT {} {} WHERE {} ORDER BY l.logged_at DESC LIMIT ?{} OFFSET ?{}",
            LOG_COLUMNS,
            from,
            where_clause,
            values.len() - 1,
            values.len()
        );
        debug!("Executing water log query: {}", sql);

        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params_from_iter(values.iter()), map_log)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((logs, total as usize))
    }

    async fn daily_volumes(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyVolume>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT date(logged_at) AS day, SUM(volume_ml), COUNT(*) FROM water_logs
             WHERE user_id = ?1 AND deleted_at IS NULL AND logged_at >= ?2 AND logged_at < ?3
             GROUP BY day ORDER BY day",
        )?;

        let days = stmt
            .query_map(params![user_id, start, end], |row| {
                Ok(DailyVolume {
                    date: row.get(0)?,
                    total_volume_ml: row.get(1)?,
                    log_count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(days)
    }

    async fn totals(&self, user_id: &str) -> Result<(i64, i64), RepositoryError> {
        let conn = self.storage.connection()?;
        let totals = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(volume_ml), 0) FROM water_logs WHERE user_id = ?1 AND deleted_at IS NULL",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(totals)
    }

    async fn with_products_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<WaterLogWithProduct>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, p.brand_name, p.packaging
             FROM water_logs l LEFT JOIN water_products p ON p.id = l.water_id
             WHERE l.user_id = ?1 AND l.deleted_at IS NULL AND l.logged_at >= ?2
             ORDER BY l.logged_at ASC",
            LOG_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![user_id, since], |row| {
                Ok(WaterLogWithProduct {
                    log: map_log(row)?,
                    brand_name: row.get(10)?,
                    packaging: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
