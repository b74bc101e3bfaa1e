use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::database::{get_db_pool, DatabasePool, SqliteConnection};
use super::errors::RepositoryError;
use super::in_memory::InMemoryStorage;

/// Connection source shared by every repository.
///
/// An explicitly supplied pool wins, then the global application pool,
/// then the shared in-memory fallback.
#[derive(Debug, Clone, Default)]
pub struct DatabaseStorage {
    pool: Option<DatabasePool>,
    fallback: InMemoryStorage,
}

impl DatabaseStorage {
    /// Storage bound to the global pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage bound to a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self {
            pool: Some(pool),
            fallback: InMemoryStorage::new(),
        }
    }

    /// Check out a connection
    pub fn connection(&self) -> Result<SqliteConnection, RepositoryError> {
        if let Some(pool) = &self.pool {
            return Ok(pool.get()?);
        }

        match get_db_pool() {
            Ok(pool) => Ok(pool.get()?),
            Err(e) => {
                debug!("Database not available ({}), using in-memory storage", e);
                self.fallback.connection()
            }
        }
    }
}

/// Encode a value for a JSON text column
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a JSON text column inside a row mapper
pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decode an optional JSON text column inside a row mapper
pub(crate) fn optional_json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Map `QueryReturnedNoRows` to `None`
pub(crate) fn optional<T>(result: rusqlite::Result<T>) -> Result<Option<T>, RepositoryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(RepositoryError::Sqlite(e)),
    }
}
