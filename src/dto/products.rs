use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{domain::inventory::ProductType, models::Product};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Derived from the title when absent.
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub product_type: Option<ProductType>,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub sku: Option<String>,
    #[serde(default)]
    pub inventory_quantity: i64,
    #[serde(default = "default_true")]
    pub track_inventory: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Variants as a list, an id-keyed object, or either one JSON-encoded.
    #[schema(value_type = Option<Object>)]
    pub variants: Option<Value>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub product_type: Option<ProductType>,
    pub price: Option<Decimal>,
    pub compare_price: Option<Decimal>,
    pub sku: Option<String>,
    pub inventory_quantity: Option<i64>,
    pub track_inventory: Option<bool>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceVariantsRequest {
    #[schema(value_type = Object)]
    pub variants: Value,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Overrides the tenant's configured threshold.
    pub threshold: Option<i64>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
