use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::{IntoParams, ToSchema};

/// Breakdown item whose zero score marks a lab-tested product
pub const UNTESTED_PENALTY_ID: &str = "untested_penalty";

string_enum!(
    /// Health bucket derived from a product's score
    HealthStatus {
        Excellent => "excellent",
        Good => "good",
        Fair => "fair",
        Poor => "poor",
    }
);

impl HealthStatus {
    /// Bucket a 0-100 score
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            HealthStatus::Excellent
        } else if score >= 75.0 {
            HealthStatus::Good
        } else if score >= 60.0 {
            HealthStatus::Fair
        } else {
            HealthStatus::Poor
        }
    }
}

string_enum!(
    /// Microplastics exposure implied by the packaging
    MicroplasticsRisk {
        High => "High Risk",
        Minimal => "Minimal",
        Unknown => "Unknown",
    }
);

string_enum!(
    /// Sortable product fields
    ProductSortField {
        Name => "name",
        Score => "score",
        Brand => "brand",
        Packaging => "packaging",
    }
);

string_enum!(
    /// Sort direction
    SortOrder {
        Asc => "asc",
        Desc => "desc",
    }
);

/// Amounts arrive as numbers, numeric strings, or the scraper's `"$undefined"`
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// Missing and null flags read as false
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// An ingredient measured in a water product
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Ingredient {
    #[serde(default)]
    pub ingredient_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    /// Measured amount; absent when the source did not report one
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub measure: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_beneficial: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_contaminant: bool,
    #[serde(default)]
    pub risks: Option<String>,
    #[serde(default)]
    pub benefits: Option<String>,
}

/// A citation backing a product's data
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Source {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// One component of a product's score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ScoreBreakdownItem {
    pub id: String,
    #[serde(default)]
    pub score: f64,
}

/// Packaging label used when a product does not record one
pub const UNKNOWN_PACKAGING: &str = "unknown";

/// A bottled water product from the catalogue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WaterProduct {
    pub id: i64,
    pub name: String,
    pub brand_name: Option<String>,
    /// Health score between 0 and 100
    pub score: f64,
    pub description: Option<String>,
    pub image: Option<String>,
    pub packaging: Option<String>,
    pub ph_level: Option<f64>,
    /// Total dissolved solids
    pub tds: Option<f64>,
    pub ingredients: Vec<Ingredient>,
    pub sources: Vec<Source>,
    pub score_breakdown: Vec<ScoreBreakdownItem>,
}

impl WaterProduct {
    pub fn health_status(&self) -> HealthStatus {
        HealthStatus::from_score(self.score)
    }

    /// Lab tested only when the untested penalty is present and zero
    pub fn lab_tested(&self) -> bool {
        self.score_breakdown
            .iter()
            .find(|item| item.id == UNTESTED_PENALTY_ID)
            .map(|item| item.score == 0.0)
            .unwrap_or(false)
    }

    pub fn contaminants(&self) -> Vec<Ingredient> {
        self.ingredients.iter().filter(|i| i.is_contaminant).cloned().collect()
    }

    pub fn nutrients(&self) -> Vec<Ingredient> {
        self.ingredients.iter().filter(|i| i.is_beneficial).cloned().collect()
    }

    /// Recorded packaging, or `unknown` when missing or blank
    pub fn packaging_label(&self) -> &str {
        match self.packaging.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p,
            _ => UNKNOWN_PACKAGING,
        }
    }

    pub fn microplastics_risk(&self) -> MicroplasticsRisk {
        match self.packaging.as_deref() {
            Some(p) if p.eq_ignore_ascii_case("plastic") => MicroplasticsRisk::High,
            Some(_) => MicroplasticsRisk::Minimal,
            None => MicroplasticsRisk::Unknown,
        }
    }

    /// Attach the derived fields
    pub fn into_details(self) -> WaterProductDetails {
        let contaminants = self.contaminants();
        let nutrients = self.nutrients();
        WaterProductDetails {
            health_status: self.health_status(),
            lab_tested: self.lab_tested(),
            microplastics_risk: self.microplastics_risk(),
            contaminants_count: contaminants.len(),
            nutrients_count: nutrients.len(),
            contaminants,
            nutrients,
            product: self,
        }
    }
}

/// A product together with the fields derived from it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WaterProductDetails {
    #[serde(flatten)]
    pub product: WaterProduct,
    pub health_status: HealthStatus,
    pub lab_tested: bool,
    pub microplastics_risk: MicroplasticsRisk,
    pub contaminants: Vec<Ingredient>,
    pub nutrients: Vec<Ingredient>,
    pub contaminants_count: usize,
    pub nutrients_count: usize,
}

/// Brand object used by scraped pages
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrandRef {
    #[serde(default)]
    pub name: Option<String>,
}

/// A product as it appears in an import file.
///
/// Scraped pages nest the brand as `{"brand": {"name": ...}}`, hand-written
/// files use `brand_name`; both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub brand: Option<BrandRef>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub packaging: Option<String>,
    #[serde(default)]
    pub ph_level: Option<f64>,
    #[serde(default)]
    pub tds: Option<f64>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub score_breakdown: Vec<ScoreBreakdownItem>,
}

impl From<ProductRecord> for WaterProduct {
    fn from(record: ProductRecord) -> Self {
        let brand_name = record
            .brand_name
            .or_else(|| record.brand.and_then(|b| b.name));
        WaterProduct {
            id: record.id,
            name: record.name,
            brand_name,
            score: record.score.unwrap_or(0.0).clamp(0.0, 100.0),
            description: record.description,
            image: record.image,
            packaging: record.packaging,
            ph_level: record.ph_level,
            tds: record.tds,
            ingredients: record.ingredients,
            sources: record.sources,
            score_breakdown: record.score_breakdown,
        }
    }
}

/// Outcome of a catalogue import
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ImportSummary {
    pub imported: usize,
    /// Entries that could not be parsed as products
    pub skipped: usize,
}

/// Request payload for adding a product to the catalogue
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateWaterProductRequest {
    /// Catalogue ID; the next free ID is used when omitted
    pub id: Option<i64>,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(max = 100, message = "Brand name cannot exceed 100 characters"))]
    pub brand_name: Option<String>,
    #[validate(range(min = 0.0, max = 100.0, message = "Score must be between 0 and 100"))]
    pub score: f64,
    pub description: Option<String>,
    pub image: Option<String>,
    pub packaging: Option<String>,
    #[validate(range(min = 0.0, max = 14.0, message = "pH must be between 0 and 14"))]
    pub ph_level: Option<f64>,
    pub tds: Option<f64>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub score_breakdown: Vec<ScoreBreakdownItem>,
}

/// Request payload for editing a product; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateWaterProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 100, message = "Brand name cannot exceed 100 characters"))]
    pub brand_name: Option<String>,
    #[validate(range(min = 0.0, max = 100.0, message = "Score must be between 0 and 100"))]
    pub score: Option<f64>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub packaging: Option<String>,
    #[validate(range(min = 0.0, max = 14.0, message = "pH must be between 0 and 14"))]
    pub ph_level: Option<f64>,
    pub tds: Option<f64>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub sources: Option<Vec<Source>>,
    pub score_breakdown: Option<Vec<ScoreBreakdownItem>>,
}

fn default_page() -> usize {
    1
}

fn default_size() -> usize {
    20
}

/// Catalogue search filters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema, IntoParams))]
#[cfg_attr(feature = "with-api", into_params(parameter_in = Query))]
pub struct WaterSearchCriteria {
    /// Substring of the name, brand or description
    pub query: Option<String>,
    /// Substring of the brand name
    pub brand: Option<String>,
    #[validate(range(min = 0.0, max = 100.0, message = "min_score must be between 0 and 100"))]
    pub min_score: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0, message = "max_score must be between 0 and 100"))]
    pub max_score: Option<f64>,
    /// Exact packaging, case-insensitive
    pub packaging: Option<String>,
    pub has_contaminants: Option<bool>,
    pub lab_tested: Option<bool>,
    pub health_status: Option<HealthStatus>,
    /// Substring of an ingredient name
    pub ingredient: Option<String>,
    pub min_ingredients: Option<usize>,
    pub max_ingredients: Option<usize>,
    pub sort_by: Option<ProductSortField>,
    pub sort_order: Option<SortOrder>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: usize,
    #[serde(default = "default_size")]
    #[validate(range(min = 1, max = 100, message = "size must be between 1 and 100"))]
    pub size: usize,
}

impl Default for WaterSearchCriteria {
    fn default() -> Self {
        Self {
            query: None,
            brand: None,
            min_score: None,
            max_score: None,
            packaging: None,
            has_contaminants: None,
            lab_tested: None,
            health_status: None,
            ingredient: None,
            min_ingredients: None,
            max_ingredients: None,
            sort_by: None,
            sort_order: None,
            page: default_page(),
            size: default_size(),
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ProductPage {
    pub items: Vec<WaterProductDetails>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
    pub total_pages: usize,
}

/// Catalogue-wide aggregates
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WaterSummary {
    pub total_products: usize,
    pub average_score: f64,
    pub excellent_count: usize,
    pub good_count: usize,
    pub fair_count: usize,
    pub poor_count: usize,
    pub lab_tested_count: usize,
    pub plastic_packaging_count: usize,
    pub glass_packaging_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(score: f64, packaging: Option<&str>, breakdown: Vec<ScoreBreakdownItem>) -> WaterProduct {
        WaterProduct {
            id: 1,
            name: "Spring".to_string(),
            brand_name: Some("Alpine".to_string()),
            score,
            description: None,
            image: None,
            packaging: packaging.map(String::from),
            ph_level: None,
            tds: None,
            ingredients: vec![],
            sources: vec![],
            score_breakdown: breakdown,
        }
    }

    fn penalty(score: f64) -> ScoreBreakdownItem {
        ScoreBreakdownItem { id: UNTESTED_PENALTY_ID.to_string(), score }
    }

    #[test]
    fn test_health_status_thresholds() {
        assert_eq!(HealthStatus::from_score(90.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(75.0), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(60.0), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_score(59.0), HealthStatus::Poor);
        assert_eq!(HealthStatus::from_score(89.9), HealthStatus::Good);
    }

    #[test]
    fn test_lab_tested_requires_zero_penalty() {
        assert!(product(80.0, None, vec![penalty(0.0)]).lab_tested());
        assert!(!product(80.0, None, vec![penalty(-10.0)]).lab_tested());
        assert!(!product(80.0, None, vec![]).lab_tested());

        let other = ScoreBreakdownItem { id: "ph".to_string(), score: 0.0 };
        assert!(!product(80.0, None, vec![other]).lab_tested());
    }

    #[test]
    fn test_microplastics_risk() {
        assert_eq!(product(50.0, Some("Plastic"), vec![]).microplastics_risk(), MicroplasticsRisk::High);
        assert_eq!(product(50.0, Some("glass"), vec![]).microplastics_risk(), MicroplasticsRisk::Minimal);
        assert_eq!(product(50.0, None, vec![]).microplastics_risk(), MicroplasticsRisk::Unknown);
        assert_eq!(serde_json::to_value(MicroplasticsRisk::High).unwrap(), json!("High Risk"));
    }

    #[test]
    fn test_ingredient_amount_parsing() {
        let ingredients: Vec<Ingredient> = serde_json::from_value(json!([
            {"name": "Calcium", "amount": "$undefined", "is_beneficial": true},
            {"name": "Lead", "amount": "0.5", "is_contaminant": true},
            {"name": "Sodium", "amount": 12, "is_beneficial": null},
            {"name": "Fluoride", "amount": "trace"}
        ]))
        .unwrap();

        assert_eq!(ingredients[0].amount, None);
        assert!(ingredients[0].is_beneficial);
        assert_eq!(ingredients[1].amount, Some(0.5));
        assert!(ingredients[1].is_contaminant);
        assert_eq!(ingredients[2].amount, Some(12.0));
        assert!(!ingredients[2].is_beneficial);
        assert_eq!(ingredients[3].amount, None);
    }

    #[test]
    fn test_product_record_accepts_nested_brand() {
        let record: ProductRecord = serde_json::from_value(json!({
            "id": 12,
            "name": "Glacier",
            "brand": {"name": "Icy"},
            "score": 88.5,
            "packaging": "glass"
        }))
        .unwrap();

        let product = WaterProduct::from(record);
        assert_eq!(product.brand_name.as_deref(), Some("Icy"));
        assert_eq!(product.score, 88.5);
        assert!(product.ingredients.is_empty());
    }

    #[test]
    fn test_details_counts() {
        let mut p = product(92.0, Some("glass"), vec![penalty(0.0)]);
        p.ingredients = vec![
            Ingredient { name: "Magnesium".into(), is_beneficial: true, ..Default::default() },
            Ingredient { name: "Arsenic".into(), is_contaminant: true, ..Default::default() },
            Ingredient { name: "Nitrate".into(), is_contaminant: true, ..Default::default() },
        ];

        let details = p.into_details();
        assert_eq!(details.health_status, HealthStatus::Excellent);
        assert!(details.lab_tested);
        assert_eq!(details.contaminants_count, 2);
        assert_eq!(details.nutrients_count, 1);

        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["name"], json!("Spring"));
        assert_eq!(value["health_status"], json!("excellent"));
    }
}
