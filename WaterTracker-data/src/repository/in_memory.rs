use once_cell::sync::OnceCell;
use tracing::warn;

use crate::database::{create_in_memory_pool, DatabasePool, SqliteConnection};
use super::errors::RepositoryError;

/// Process-wide in-memory database used when no pool was initialized
static FALLBACK_POOL: OnceCell<DatabasePool> = OnceCell::new();

/// In-memory storage used when the configured database is not available.
///
/// All repositories share one lazily created in-memory SQLite database so
/// that cross-table queries keep working without a file database.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryStorage;

impl InMemoryStorage {
    /// Create a new in-memory storage handle
    pub fn new() -> Self {
        Self
    }

    /// Check out the single connection of the fallback database
    pub fn connection(&self) -> Result<SqliteConnection, RepositoryError> {
        let pool = FALLBACK_POOL.get_or_try_init(|| {
            warn!("Database pool not initialized, using in-memory SQLite storage");
            create_in_memory_pool()
        })?;
        Ok(pool.get()?)
    }
}
