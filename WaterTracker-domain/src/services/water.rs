use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::entities::conversions;
use crate::entities::water::{
    CreateWaterProductRequest, HealthStatus, ImportSummary, ProductPage, ProductRecord, ProductSortField,
    SortOrder, UpdateWaterProductRequest, WaterProduct, WaterProductDetails, WaterSearchCriteria, WaterSummary,
};
use crate::services::errors::{validate_request, ServiceError};
use water_tracker_data::repository::WaterProductRepositoryTrait;

/// Trait for the water product catalogue
#[async_trait]
pub trait WaterServiceTrait {
    /// Import a JSON array of products or a scraped `{"results": [...]}` page
    async fn import_products(&self, json: &str) -> Result<ImportSummary, ServiceError>;

    /// Read a products file and import it
    async fn import_file(&self, path: &Path) -> Result<ImportSummary, ServiceError>;

    async fn get_product(&self, id: i64) -> Result<WaterProductDetails, ServiceError>;

    async fn search_products(&self, criteria: &WaterSearchCriteria) -> Result<ProductPage, ServiceError>;

    async fn get_summary(&self) -> Result<WaterSummary, ServiceError>;

    /// Highest scores first
    async fn top_rated(&self, limit: usize) -> Result<Vec<WaterProductDetails>, ServiceError>;

    /// Distinct brand names, sorted
    async fn list_brands(&self) -> Result<Vec<String>, ServiceError>;

    /// Distinct packaging types, sorted
    async fn list_packaging_types(&self) -> Result<Vec<String>, ServiceError>;

    async fn create_product(&self, request: CreateWaterProductRequest) -> Result<WaterProductDetails, ServiceError>;

    async fn update_product(&self, id: i64, request: UpdateWaterProductRequest) -> Result<WaterProductDetails, ServiceError>;

    async fn delete_product(&self, id: i64) -> Result<(), ServiceError>;
}

/// Water product service for domain logic
pub struct WaterService<R: WaterProductRepositoryTrait> {
    repository: R,
    clock: SharedClock,
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

/// Whether a product passes every filter of the criteria
pub fn matches_criteria(product: &WaterProduct, criteria: &WaterSearchCriteria) -> bool {
    if let Some(query) = &criteria.query {
        let hit = contains_ignore_case(Some(&product.name), query)
            || contains_ignore_case(product.brand_name.as_deref(), query)
            || contains_ignore_case(product.description.as_deref(), query);
        if !hit {
            return false;
        }
    }
    if let Some(brand) = &criteria.brand {
        if !contains_ignore_case(product.brand_name.as_deref(), brand) {
            return false;
        }
    }
    if criteria.min_score.map_or(false, |min| product.score < min) {
        return false;
    }
    if criteria.max_score.map_or(false, |max| product.score > max) {
        return false;
    }
    if let Some(packaging) = &criteria.packaging {
        if !product.packaging_label().eq_ignore_ascii_case(packaging.trim()) {
            return false;
        }
    }
    if let Some(has_contaminants) = criteria.has_contaminants {
        if product.ingredients.iter().any(|i| i.is_contaminant) != has_contaminants {
            return false;
        }
    }
    if let Some(lab_tested) = criteria.lab_tested {
        if product.lab_tested() != lab_tested {
            return false;
        }
    }
    if let Some(status) = criteria.health_status {
        if product.health_status() != status {
            return false;
        }
    }
    if let Some(ingredient) = &criteria.ingredient {
        if !product.ingredients.iter().any(|i| contains_ignore_case(Some(&i.name), ingredient)) {
            return false;
        }
    }
    if criteria.min_ingredients.map_or(false, |min| product.ingredients.len() < min) {
        return false;
    }
    if criteria.max_ingredients.map_or(false, |max| product.ingredients.len() > max) {
        return false;
    }
    true
}

fn compare_optional(a: Option<&str>, b: Option<&str>) -> Ordering {
    a.map(str::to_lowercase).cmp(&b.map(str::to_lowercase))
}

fn compare_products(a: &WaterProduct, b: &WaterProduct, field: ProductSortField) -> Ordering {
    match field {
        ProductSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        ProductSortField::Score => a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal),
        ProductSortField::Brand => compare_optional(a.brand_name.as_deref(), b.brand_name.as_deref()),
        ProductSortField::Packaging => compare_optional(a.packaging.as_deref(), b.packaging.as_deref()),
    }
}

/// Parse an import document into product records, counting entries that are not products
fn parse_import(json: &str) -> Result<(Vec<ProductRecord>, usize), ServiceError> {
    let document: Value = serde_json::from_str(json)
        .map_err(|e| ServiceError::ValidationError(format!("Import file is not valid JSON: {}", e)))?;

    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut page) => match page.remove("results") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(ServiceError::ValidationError(
                    "Import page must contain a \"results\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ServiceError::ValidationError(
                "Import file must be an array of products or a page with results".to_string(),
            ))
        }
    };

    let mut records = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for entry in entries {
        match serde_json::from_value::<ProductRecord>(entry) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping product entry: {}", e);
                skipped += 1;
            }
        }
    }
    Ok((records, skipped))
}

impl<R: WaterProductRepositoryTrait> WaterService<R> {
    pub fn new(repository: R, clock: SharedClock) -> Self {
        Self { repository, clock }
    }

    async fn all_products(&self) -> Result<Vec<WaterProduct>, ServiceError> {
        self.repository.get_all()
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_product)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::corrupt)
    }

    async fn load(&self, id: i64) -> Result<(WaterProduct, chrono::DateTime<chrono::Utc>), ServiceError> {
        let stored = self.repository.get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Water product", id))?;
        let created_at = stored.created_at;
        let product = conversions::convert_to_domain_product(stored).map_err(ServiceError::corrupt)?;
        Ok((product, created_at))
    }

    async fn save(&self, product: &WaterProduct, created_at: chrono::DateTime<chrono::Utc>) -> Result<(), ServiceError> {
        let data_product = conversions::convert_to_data_product(product, created_at, self.clock.now())
            .map_err(ServiceError::ValidationError)?;
        self.repository.upsert(data_product).await?;
        Ok(())
    }

    async fn distinct<F>(&self, field: F) -> Result<Vec<String>, ServiceError>
    where
        F: Fn(&WaterProduct) -> Option<&str> + Send,
    {
        let products = self.all_products().await?;
        let values: BTreeSet<String> = products
            .iter()
            .filter_map(|p| field(p))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        Ok(values.into_iter().collect())
    }
}

#[async_trait]
impl<R: WaterProductRepositoryTrait + Send + Sync> WaterServiceTrait for WaterService<R> {
    async fn import_products(&self, json: &str) -> Result<ImportSummary, ServiceError> {
        let (records, skipped) = parse_import(json)?;
        let now = self.clock.now();

        let mut imported = 0;
        for record in records {
            let product = WaterProduct::from(record);
            let created_at = match self.repository.get_by_id(product.id).await? {
                Some(existing) => existing.created_at,
                None => now,
            };
            self.save(&product, created_at).await?;
            imported += 1;
        }

        info!("Imported {} water products ({} skipped)", imported, skipped);
        Ok(ImportSummary { imported, skipped })
    }

    async fn import_file(&self, path: &Path) -> Result<ImportSummary, ServiceError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            ServiceError::ValidationError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        self.import_products(&json).await
    }

    async fn get_product(&self, id: i64) -> Result<WaterProductDetails, ServiceError> {
        debug!("Getting water product {}", id);
        let (product, _) = self.load(id).await?;
        Ok(product.into_details())
    }

    async fn search_products(&self, criteria: &WaterSearchCriteria) -> Result<ProductPage, ServiceError> {
        validate_request(criteria)?;

        let mut matches: Vec<WaterProduct> = self.all_products()
            .await?
            .into_iter()
            .filter(|p| matches_criteria(p, criteria))
            .collect();

        let field = criteria.sort_by.unwrap_or(ProductSortField::Score);
        let order = criteria.sort_order.unwrap_or(SortOrder::Desc);
        matches.sort_by(|a, b| {
            let ordering = compare_products(a, b, field);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matches.len();
        let items = matches
            .into_iter()
            .skip((criteria.page - 1).saturating_mul(criteria.size))
            .take(criteria.size)
            .map(WaterProduct::into_details)
            .collect();

        Ok(ProductPage {
            items,
            total,
            page: criteria.page,
            size: criteria.size,
            total_pages: total.div_ceil(criteria.size),
        })
    }

    async fn get_summary(&self) -> Result<WaterSummary, ServiceError> {
        let products = self.all_products().await?;
        let mut summary = WaterSummary {
            total_products: products.len(),
            average_score: 0.0,
            excellent_count: 0,
            good_count: 0,
            fair_count: 0,
            poor_count: 0,
            lab_tested_count: 0,
            plastic_packaging_count: 0,
            glass_packaging_count: 0,
        };
        if products.is_empty() {
            return Ok(summary);
        }

        let mut score_total = 0.0;
        for product in &products {
            score_total += product.score;
            match product.health_status() {
                HealthStatus::Excellent => summary.excellent_count += 1,
                HealthStatus::Good => summary.good_count += 1,
                HealthStatus::Fair => summary.fair_count += 1,
                HealthStatus::Poor => summary.poor_count += 1,
            }
            if product.lab_tested() {
                summary.lab_tested_count += 1;
            }
            match product.packaging.as_deref() {
                Some(p) if p.eq_ignore_ascii_case("plastic") => summary.plastic_packaging_count += 1,
                Some(p) if p.eq_ignore_ascii_case("glass") => summary.glass_packaging_count += 1,
                _ => {},
            }
        }
        summary.average_score = score_total / products.len() as f64;
        Ok(summary)
    }

    async fn top_rated(&self, limit: usize) -> Result<Vec<WaterProductDetails>, ServiceError> {
        let mut products = self.all_products().await?;
        products.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        Ok(products.into_iter().take(limit).map(WaterProduct::into_details).collect())
    }

    async fn list_brands(&self) -> Result<Vec<String>, ServiceError> {
        self.distinct(|p| p.brand_name.as_deref()).await
    }

    async fn list_packaging_types(&self) -> Result<Vec<String>, ServiceError> {
        self.distinct(|p| Some(p.packaging_label())).await
    }

    async fn create_product(&self, request: CreateWaterProductRequest) -> Result<WaterProductDetails, ServiceError> {
        validate_request(&request)?;

        let id = match request.id {
            Some(id) => {
                if self.repository.get_by_id(id).await?.is_some() {
                    return Err(ServiceError::Conflict(format!("Water product with ID {} already exists", id)));
                }
                id
            },
            None => self.repository.max_id().await? + 1,
        };

        let product = WaterProduct {
            id,
            name: request.name,
            brand_name: request.brand_name,
            score: request.score,
            description: request.description,
            image: request.image,
            packaging: request.packaging,
            ph_level: request.ph_level,
            tds: request.tds,
            ingredients: request.ingredients,
            sources: request.sources,
            score_breakdown: request.score_breakdown,
        };
        self.save(&product, self.clock.now()).await?;

        info!("Created water product {} ({})", product.name, product.id);
        Ok(product.into_details())
    }

    async fn update_product(&self, id: i64, request: UpdateWaterProductRequest) -> Result<WaterProductDetails, ServiceError> {
        validate_request(&request)?;
        let (mut product, created_at) = self.load(id).await?;

        if let Some(name) = request.name {
            product.name = name;
        }
        if let Some(brand_name) = request.brand_name {
            product.brand_name = Some(brand_name);
        }
        if let Some(score) = request.score {
            product.score = score;
        }
        if let Some(description) = request.description {
            product.description = Some(description);
        }
        if let Some(image) = request.image {
            product.image = Some(image);
        }
        if let Some(packaging) = request.packaging {
            product.packaging = Some(packaging);
        }
        if let Some(ph_level) = request.ph_level {
            product.ph_level = Some(ph_level);
        }
        if let Some(tds) = request.tds {
            product.tds = Some(tds);
        }
        if let Some(ingredients) = request.ingredients {
            product.ingredients = ingredients;
        }
        if let Some(sources) = request.sources {
            product.sources = sources;
        }
        if let Some(score_breakdown) = request.score_breakdown {
            product.score_breakdown = score_breakdown;
        }

        self.save(&product, created_at).await?;
        info!("Updated water product {}", id);
        Ok(product.into_details())
    }

    async fn delete_product(&self, id: i64) -> Result<(), ServiceError> {
        if !self.repository.delete(id).await? {
            return Err(ServiceError::not_found("Water product", id));
        }
        info!("Deleted water product {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::water::{MicroplasticsRisk, UNKNOWN_PACKAGING};
    use crate::testing::TestContext;
    use serde_json::json;

    fn catalogue() -> String {
        json!([
            {
                "id": 1,
                "name": "Glacier Pure",
                "brand": {"name": "Glacier"},
                "score": 95,
                "packaging": "glass",
                "ingredients": [{"name": "Calcium", "amount": 12, "is_beneficial": true}],
                "score_breakdown": [{"id": "untested_penalty", "score": 0}]
            },
            {
                "id": 2,
                "name": "City Tap",
                "brand_name": "Metro",
                "score": 58,
                "packaging": "Plastic",
                "description": "Filtered municipal water",
                "ingredients": [
                    {"name": "Fluoride", "amount": "$undefined", "is_contaminant": true},
                    {"name": "Calcium", "amount": "4.5", "is_beneficial": true}
                ]
            },
            {
                "id": 3,
                "name": "Spring Valley",
                "brand_name": "Valley",
                "score": 78,
                "packaging": "can"
            },
            {"name": "missing id"}
        ])
        .to_string()
    }

    async fn seeded() -> TestContext {
        let ctx = TestContext::new();
        let summary = ctx.services.water.import_products(&catalogue()).await.unwrap();
        assert_eq!(summary, ImportSummary { imported: 3, skipped: 1 });
        ctx
    }

    #[tokio::test]
    async fn test_import_accepts_scraped_page() {
        let ctx = TestContext::new();
        let page = json!({"results": [{"id": 9, "name": "Paged", "score": 61}], "next": null}).to_string();
        let summary = ctx.services.water.import_products(&page).await.unwrap();
        assert_eq!(summary.imported, 1);

        let product = ctx.services.water.get_product(9).await.unwrap();
        assert_eq!(product.health_status, HealthStatus::Fair);
        assert!(!product.lab_tested);
        assert_eq!(product.microplastics_risk, MicroplasticsRisk::Unknown);
    }

    #[tokio::test]
    async fn test_import_rejects_other_documents() {
        let ctx = TestContext::new();
        let err = ctx.services.water.import_products("{\"items\": []}").await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        assert!(ctx.services.water.import_products("not json").await.is_err());
    }

    #[tokio::test]
    async fn test_product_details_are_derived() {
        let ctx = seeded().await;
        let glacier = ctx.services.water.get_product(1).await.unwrap();
        assert_eq!(glacier.product.brand_name.as_deref(), Some("Glacier"));
        assert_eq!(glacier.health_status, HealthStatus::Excellent);
        assert!(glacier.lab_tested);

        let tap = ctx.services.water.get_product(2).await.unwrap();
        assert_eq!(tap.health_status, HealthStatus::Poor);
        assert_eq!(tap.microplastics_risk, MicroplasticsRisk::High);
        assert_eq!(tap.contaminants_count, 1);
        assert_eq!(tap.contaminants[0].amount, None);
        assert_eq!(tap.nutrients[0].amount, Some(4.5));
    }

    #[tokio::test]
    async fn test_search_filters_sort_and_pages() {
        let ctx = seeded().await;

        let criteria = WaterSearchCriteria { ingredient: Some("calc".to_string()), ..Default::default() };
        let page = ctx.services.water.search_products(&criteria).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].product.id, 1);

        let criteria = WaterSearchCriteria { packaging: Some("PLASTIC".to_string()), ..Default::default() };
        assert_eq!(ctx.services.water.search_products(&criteria).await.unwrap().total, 1);

        let criteria = WaterSearchCriteria { query: Some("municipal".to_string()), ..Default::default() };
        assert_eq!(ctx.services.water.search_products(&criteria).await.unwrap().items[0].product.id, 2);

        let criteria = WaterSearchCriteria {
            sort_by: Some(ProductSortField::Name),
            sort_order: Some(SortOrder::Asc),
            size: 2,
            page: 2,
            ..Default::default()
        };
        let page = ctx.services.water.search_products(&criteria).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].product.name, "Spring Valley");

        let criteria = WaterSearchCriteria { lab_tested: Some(true), has_contaminants: Some(false), ..Default::default() };
        assert_eq!(ctx.services.water.search_products(&criteria).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_search_rejects_bad_paging() {
        let ctx = seeded().await;
        let criteria = WaterSearchCriteria { size: 500, ..Default::default() };
        let err = ctx.services.water.search_products(&criteria).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_page_far_past_the_end_is_empty() {
        let ctx = seeded().await;
        let criteria = WaterSearchCriteria { page: usize::MAX, size: 20, ..Default::default() };
        let page = ctx.services.water.search_products(&criteria).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.page, usize::MAX);
    }

    #[tokio::test]
    async fn test_missing_packaging_is_listed_and_filtered_as_unknown() {
        let ctx = seeded().await;
        let mystery = json!([{"id": 4, "name": "Mystery", "brand_name": "Nobody", "score": 40}]).to_string();
        ctx.services.water.import_products(&mystery).await.unwrap();

        assert_eq!(
            ctx.services.water.list_packaging_types().await.unwrap(),
            vec!["Plastic", "can", "glass", UNKNOWN_PACKAGING]
        );

        let criteria = WaterSearchCriteria { packaging: Some("Unknown".to_string()), ..Default::default() };
        let page = ctx.services.water.search_products(&criteria).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].product.id, 4);
    }

    #[tokio::test]
    async fn test_summary_and_listings() {
        let ctx = seeded().await;
        let summary = ctx.services.water.get_summary().await.unwrap();
        assert_eq!(summary.total_products, 3);
        assert_eq!(summary.excellent_count, 1);
        assert_eq!(summary.good_count, 1);
        assert_eq!(summary.poor_count, 1);
        assert_eq!(summary.lab_tested_count, 1);
        assert_eq!(summary.plastic_packaging_count, 1);
        assert_eq!(summary.glass_packaging_count, 1);
        assert!((summary.average_score - 77.0).abs() < 1e-9);

        assert_eq!(ctx.services.water.list_brands().await.unwrap(), vec!["Glacier", "Metro", "Valley"]);
        assert_eq!(ctx.services.water.list_packaging_types().await.unwrap(), vec!["Plastic", "can", "glass"]);
        let top = ctx.services.water.top_rated(2).await.unwrap();
        assert_eq!(top.iter().map(|p| p.product.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_admin_crud() {
        let ctx = seeded().await;
        let request = CreateWaterProductRequest {
            id: None,
            name: "New Spring".to_string(),
            brand_name: None,
            score: 88.0,
            description: None,
            image: None,
            packaging: None,
            ph_level: Some(7.4),
            tds: None,
            ingredients: vec![],
            sources: vec![],
            score_breakdown: vec![],
        };
        let created = ctx.services.water.create_product(request.clone()).await.unwrap();
        assert_eq!(created.product.id, 4);

        let duplicate = CreateWaterProductRequest { id: Some(4), ..request };
        assert!(matches!(
            ctx.services.water.create_product(duplicate).await.unwrap_err(),
            ServiceError::Conflict(_)
        ));

        let updated = ctx.services.water
            .update_product(4, UpdateWaterProductRequest { score: Some(91.0), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.health_status, HealthStatus::Excellent);

        ctx.services.water.delete_product(4).await.unwrap();
        assert!(matches!(ctx.services.water.get_product(4).await.unwrap_err(), ServiceError::NotFound(_)));
    }
}
