//! Stock and price rollup over a product and its variants.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::domain::money::{decimal_from_json, format_amount, format_range};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
pub const NO_VARIANTS: &str = "no variants";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Single,
    Variable,
    Digital,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Single => "single",
            ProductType::Variable => "variable",
            ProductType::Digital => "digital",
        }
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(ProductType::Single),
            "variable" => Ok(ProductType::Variable),
            "digital" => Ok(ProductType::Digital),
            other => Err(format!("unknown product type '{other}'")),
        }
    }
}

/// Canonical variant shape used by the aggregator, whatever the source.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Variant {
    pub id: Option<String>,
    pub title: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub inventory_quantity: i64,
    pub is_active: bool,
}

/// Legacy variant column contents, as found in older product rows.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantPayload {
    /// JSON text that itself holds an object or an array.
    Encoded(String),
    Object(Map<String, Value>),
    List(Vec<Value>),
}

impl VariantPayload {
    /// `None` for payload shapes that can never hold variants.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(VariantPayload::Encoded(text)),
            Value::Object(map) => Some(VariantPayload::Object(map)),
            Value::Array(items) => Some(VariantPayload::List(items)),
            _ => None,
        }
    }

    pub fn decode(self) -> Vec<Variant> {
        match self {
            VariantPayload::Encoded(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => VariantPayload::Object(map).decode(),
                Ok(Value::Array(items)) => VariantPayload::List(items).decode(),
                _ => Vec::new(),
            },
            VariantPayload::Object(map) => {
                if looks_like_variant(&map) {
                    variant_from_map(&map).into_iter().collect()
                } else {
                    // keyed by variant id
                    map.values().filter_map(variant_from_entry).collect()
                }
            }
            VariantPayload::List(items) => items.iter().filter_map(variant_from_entry).collect(),
        }
    }
}

/// Decodes an optional legacy column straight into variants.
pub fn decode_legacy_variants(raw: Option<Value>) -> Vec<Variant> {
    raw.and_then(VariantPayload::from_value)
        .map(VariantPayload::decode)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Good,
    Low,
    Out,
    Digital,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StockSummary {
    pub total_stock: i64,
    pub status: StockStatus,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
    pub price_display: String,
    pub active_variant_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct StockRules<'a> {
    pub low_stock_threshold: i64,
    pub currency: &'a str,
}

impl Default for StockRules<'_> {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            currency: "USD",
        }
    }
}

pub fn summarize(
    product_type: ProductType,
    base_price: Decimal,
    base_quantity: i64,
    variants: &[Variant],
    rules: &StockRules<'_>,
) -> StockSummary {
    let active: Vec<&Variant> = variants.iter().filter(|v| v.is_active).collect();
    let active_variant_count = active.len();

    match product_type {
        ProductType::Digital => StockSummary {
            total_stock: 0,
            status: StockStatus::Digital,
            is_low_stock: false,
            is_out_of_stock: false,
            price_display: format_amount(base_price, rules.currency),
            active_variant_count,
        },
        ProductType::Single => {
            with_status(base_quantity, rules, format_amount(base_price, rules.currency), active_variant_count)
        }
        ProductType::Variable => {
            let total = active
                .iter()
                .map(|v| v.inventory_quantity)
                .fold(0i64, i64::saturating_add);
            let min = active.iter().map(|v| v.price).min();
            let max = active.iter().map(|v| v.price).max();
            let price_display = match (min, max) {
                (Some(min), Some(max)) => format_range(min, max, rules.currency),
                _ => NO_VARIANTS.to_string(),
            };
            with_status(total, rules, price_display, active_variant_count)
        }
    }
}

pub fn stock_status(total: i64, threshold: i64) -> StockStatus {
    if total <= 0 {
        StockStatus::Out
    } else if total <= threshold {
        StockStatus::Low
    } else {
        StockStatus::Good
    }
}

fn with_status(
    total: i64,
    rules: &StockRules<'_>,
    price_display: String,
    active_variant_count: usize,
) -> StockSummary {
    let status = stock_status(total, rules.low_stock_threshold);
    StockSummary {
        total_stock: total,
        status,
        is_low_stock: status == StockStatus::Low,
        is_out_of_stock: status == StockStatus::Out,
        price_display,
        active_variant_count,
    }
}

const VARIANT_KEYS: [&str; 5] = ["price", "inventory_quantity", "sku", "is_active", "title"];

fn looks_like_variant(map: &Map<String, Value>) -> bool {
    VARIANT_KEYS.iter().any(|key| map.contains_key(*key))
}

fn variant_from_entry(value: &Value) -> Option<Variant> {
    value.as_object().and_then(variant_from_map)
}

fn variant_from_map(map: &Map<String, Value>) -> Option<Variant> {
    Some(Variant {
        id: map.get("id").and_then(text),
        title: map.get("title").or_else(|| map.get("name")).and_then(text),
        sku: map.get("sku").and_then(text),
        price: map.get("price").and_then(decimal_from_json).unwrap_or_default(),
        compare_price: map.get("compare_price").and_then(decimal_from_json),
        inventory_quantity: map
            .get("inventory_quantity")
            .map(lenient_quantity)
            .unwrap_or_default(),
        is_active: !matches!(map.get("is_active"), Some(Value::Bool(false)))
            && !matches!(map.get("is_active"), Some(Value::String(s)) if s == "false"),
    })
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_quantity(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or_default(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .unwrap_or_default()
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variant(qty: i64, active: bool, price: i64) -> Variant {
        Variant {
            id: None,
            title: None,
            sku: None,
            price: Decimal::new(price, 0),
            compare_price: None,
            inventory_quantity: qty,
            is_active: active,
        }
    }

    #[test]
    fn variable_product_sums_only_active_variants() {
        let variants = vec![variant(3, true, 10), variant(0, true, 12), variant(5, false, 8)];
        let summary = summarize(
            ProductType::Variable,
            Decimal::ZERO,
            99,
            &variants,
            &StockRules::default(),
        );
        assert_eq!(summary.total_stock, 3);
        assert_eq!(summary.status, StockStatus::Low);
        assert!(summary.is_low_stock);
        assert!(!summary.is_out_of_stock);
        assert_eq!(summary.price_display, "$10\u{2013}$12");
        assert_eq!(summary.active_variant_count, 2);
    }

    #[test]
    fn huge_legacy_quantities_saturate_instead_of_wrapping() {
        let variants = vec![variant(i64::MAX, true, 10), variant(i64::MAX - 1, true, 10)];
        let summary = summarize(
            ProductType::Variable,
            Decimal::ZERO,
            0,
            &variants,
            &StockRules::default(),
        );
        assert_eq!(summary.total_stock, i64::MAX);
        assert_eq!(summary.status, StockStatus::Good);
        assert!(!summary.is_out_of_stock);
    }

    #[test]
    fn variable_product_without_active_variants_reports_marker() {
        let variants = vec![variant(5, false, 8)];
        let summary = summarize(
            ProductType::Variable,
            Decimal::new(20, 0),
            10,
            &variants,
            &StockRules::default(),
        );
        assert_eq!(summary.price_display, NO_VARIANTS);
        assert_eq!(summary.total_stock, 0);
        assert_eq!(summary.status, StockStatus::Out);
    }

    #[test]
    fn digital_products_ignore_stock() {
        let summary = summarize(
            ProductType::Digital,
            Decimal::new(15, 0),
            0,
            &[],
            &StockRules::default(),
        );
        assert_eq!(summary.status, StockStatus::Digital);
        assert_eq!(summary.total_stock, 0);
        assert!(!summary.is_out_of_stock);
        assert_eq!(summary.price_display, "$15");
    }

    #[test]
    fn single_product_thresholds() {
        let rules = StockRules {
            low_stock_threshold: 5,
            currency: "USD",
        };
        let at = |qty| summarize(ProductType::Single, Decimal::ONE, qty, &[], &rules).status;
        assert_eq!(at(0), StockStatus::Out);
        assert_eq!(at(1), StockStatus::Low);
        assert_eq!(at(5), StockStatus::Low);
        assert_eq!(at(6), StockStatus::Good);
    }

    #[test]
    fn encoded_string_payload_decodes() {
        let raw = json!(r#"[{"price": "10", "inventory_quantity": "4"}, 7, "junk"]"#);
        let variants = decode_legacy_variants(Some(raw));
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].inventory_quantity, 4);
        assert_eq!(variants[0].price, Decimal::new(10, 0));
        assert!(variants[0].is_active);
    }

    #[test]
    fn object_payload_single_or_keyed() {
        let single = decode_legacy_variants(Some(json!({"price": 5, "inventory_quantity": 2})));
        assert_eq!(single.len(), 1);

        let keyed = decode_legacy_variants(Some(json!({
            "a": {"price": 5, "inventory_quantity": 2, "is_active": false},
            "b": {"price": 7, "inventory_quantity": "abc"}
        })));
        assert_eq!(keyed.len(), 2);
        assert!(keyed.iter().any(|v| !v.is_active));
        assert!(keyed.iter().any(|v| v.inventory_quantity == 0 && v.price == Decimal::new(7, 0)));
    }

    #[test]
    fn unparsable_payloads_are_absent() {
        assert!(decode_legacy_variants(Some(json!("{not json"))).is_empty());
        assert!(decode_legacy_variants(Some(json!(42))).is_empty());
        assert!(decode_legacy_variants(None).is_empty());
    }
}
