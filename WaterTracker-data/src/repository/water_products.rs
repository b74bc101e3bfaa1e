use rusqlite::{params, Row};
use tracing::debug;
use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::models::water_product::WaterProduct;
use super::errors::RepositoryError;
use super::storage::{json_column, optional, to_json, DatabaseStorage};

const PRODUCT_COLUMNS: &str = "id, name, brand_name, score, description, image, packaging, ph_level, tds, \
    ingredients, sources, score_breakdown, created_at, updated_at";

/// Repository trait for the water product catalogue
#[async_trait]
pub trait WaterProductRepositoryTrait {
    /// Insert a product or replace the one with the same ID
    async fn upsert(&self, product: WaterProduct) -> Result<WaterProduct, RepositoryError>;

    /// Get a product by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<WaterProduct>, RepositoryError>;

    /// Get every product, ordered by ID
    async fn get_all(&self) -> Result<Vec<WaterProduct>, RepositoryError>;

    /// Delete a product. Returns false when it did not exist.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Largest ID in use, 0 for an empty catalogue
    async fn max_id(&self) -> Result<i64, RepositoryError>;
}

/// SQLite-backed product catalogue
#[derive(Debug, Clone, Default)]
pub struct WaterProductRepository {
    storage: DatabaseStorage,
}

impl WaterProductRepository {
    /// Create a repository on the application pool
    pub fn new() -> Self {
        Self { storage: DatabaseStorage::new() }
    }

    /// Create a repository on a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self { storage: DatabaseStorage::with_pool(pool) }
    }
}

fn map_product(row: &Row<'_>) -> rusqlite::Result<WaterProduct> {
    Ok(WaterProduct {
        id: row.get(0)?,
        name: row.get(1)?,
        brand_name: row.get(2)?,
        score: row.get(3)?,
        description: row.get(4)?,
        image: row.get(5)?,
        packaging: row.get(6)?,
        ph_level: row.get(7)?,
        tds: row.get(8)?,
        ingredients: json_column(row, 9)?,
        sources: json_column(row, 10)?,
        score_breakdown: json_column(row, 11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

#[async_trait]
impl WaterProductRepositoryTrait for WaterProductRepository {
    async fn upsert(&self, product: WaterProduct) -> Result<WaterProduct, RepositoryError> {
        debug!("Upserting water product: id={}", product.id);
        let conn = self.storage.connection()?;

        conn.execute(
            &format!(
                "INSERT INTO water_products ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    brand_name = excluded.brand_name,
                    score = excluded.score,
                    description = excluded.description,
                    image = excluded.image,
                    packaging = excluded.packaging,
                    ph_level = excluded.ph_level,
                    tds = excluded.tds,
                    ingredients = excluded.ingredients,
                    sources = excluded.sources,
                    score_breakdown = excluded.score_breakdown,
                    updated_at = excluded.updated_at",
                PRODUCT_COLUMNS
            ),
            params![
                product.id,
                product.name,
                product.brand_name,
                product.score,
                product.description,
                product.image,
                product.packaging,
                product.ph_level,
                product.tds,
                to_json(&product.ingredients)?,
                to_json(&product.sources)?,
                to_json(&product.score_breakdown)?,
                product.created_at,
                product.updated_at,
            ],
        ).map_err(RepositoryError::from_write)?;

        Ok(product)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<WaterProduct>, RepositoryError> {
        let conn = self.storage.connection()?;
        optional(conn.query_row(
            &format!("SELECT {} FROM water_products WHERE id = ?1", PRODUCT_COLUMNS),
            [id],
            map_product,
        ))
    }

    async fn get_all(&self) -> Result<Vec<WaterProduct>, RepositoryError> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM water_products ORDER BY id", PRODUCT_COLUMNS))?;
        let products = stmt.query_map([], map_product)?.collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let conn = self.storage.connection()?;
        let deleted = conn.execute("DELETE FROM water_products WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    async fn max_id(&self) -> Result<i64, RepositoryError> {
        let conn = self.storage.connection()?;
        let id: i64 = conn.query_row("SELECT COALESCE(MAX(id), 0) FROM water_products", [], |row| row.get(0))?;
        Ok(id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use crate::database::create_in_memory_pool;

    pub(crate) fn sample_product(id: i64, brand: &str, packaging: &str) -> WaterProduct {
        let now = Utc::now();
        WaterProduct {
            id,
            name: format!("{} Spring", brand),
            brand_name: Some(brand.to_string()),
            score: 80.0,
            description: None,
            image: None,
            packaging: Some(packaging.to_string()),
            ph_level: Some(7.2),
            tds: None,
            ingredients: json!([]),
            sources: json!([]),
            score_breakdown: json!([{"id": "untested_penalty", "score": 0}]),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_product() {
        let repo = WaterProductRepository::with_pool(create_in_memory_pool().unwrap());
        repo.upsert(sample_product(7, "Alpine", "glass")).await.unwrap();

        let mut changed = sample_product(7, "Alpine", "plastic");
        changed.score = 42.0;
        repo.upsert(changed).await.unwrap();

        let stored = repo.get_by_id(7).await.unwrap().unwrap();
        assert_eq!(stored.score, 42.0);
        assert_eq!(stored.packaging.as_deref(), Some("plastic"));
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
        assert_eq!(repo.max_id().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_delete_product() {
        let repo = WaterProductRepository::with_pool(create_in_memory_pool().unwrap());
        repo.upsert(sample_product(1, "Alpine", "glass")).await.unwrap();

        assert!(repo.delete(1).await.unwrap());
        assert!(!repo.delete(1).await.unwrap());
        assert!(repo.get_by_id(1).await.unwrap().is_none());
    }
}
