//! Shipping options for a cart against a tenant's configured methods.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::money::decimal_from_json;

/// Default weight attributed to one unit when the product carries none.
pub const NOMINAL_UNIT_WEIGHT: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CartLine {
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub price: Decimal,
    pub quantity: i32,
    /// Per-unit weight when the storefront knows it.
    pub weight: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct Destination {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

/// How much a cart line weighs; `None` when the weight overflows.
pub trait WeightModel {
    fn line_weight(&self, line: &CartLine) -> Option<Decimal>;
}

/// Fixed weight per unit, ignoring anything declared on the line.
#[derive(Debug, Clone, Copy)]
pub struct NominalWeight(pub Decimal);

impl Default for NominalWeight {
    fn default() -> Self {
        Self(NOMINAL_UNIT_WEIGHT)
    }
}

impl WeightModel for NominalWeight {
    fn line_weight(&self, line: &CartLine) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(line.quantity.max(0)))
    }
}

/// Declared per-unit weight, falling back to the nominal one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredWeight(pub NominalWeight);

impl WeightModel for DeclaredWeight {
    fn line_weight(&self, line: &CartLine) -> Option<Decimal> {
        match line.weight {
            Some(weight) if weight >= Decimal::ZERO => {
                weight.checked_mul(Decimal::from(line.quantity.max(0)))
            }
            _ => self.0.line_weight(line),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShippingKind {
    WeightBased,
    FlatRate,
    Free,
}

impl ShippingKind {
    fn default_window(&self) -> (u32, u32) {
        match self {
            ShippingKind::WeightBased => (3, 5),
            ShippingKind::FlatRate => (3, 7),
            ShippingKind::Free => (7, 14),
        }
    }
}

impl FromStr for ShippingKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weight_based" => Ok(ShippingKind::WeightBased),
            "flat_rate" => Ok(ShippingKind::FlatRate),
            "free" => Ok(ShippingKind::Free),
            _ => Err(()),
        }
    }
}

/// A tenant shipping method after boundary decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingMethod {
    pub id: String,
    pub name: String,
    pub kind: ShippingKind,
    pub enabled: bool,
    pub base_rate: Decimal,
    pub per_kg_rate: Decimal,
    pub free_threshold: Option<Decimal>,
    pub max_weight: Option<Decimal>,
    pub countries: Vec<String>,
    pub min_days: u32,
    pub max_days: u32,
}

/// Settings JSON as written by the admin console.
#[derive(Debug, Deserialize)]
struct RawMethod {
    id: Option<Value>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    base_rate: Option<Value>,
    per_kg_rate: Option<Value>,
    free_threshold: Option<Value>,
    max_weight: Option<Value>,
    #[serde(default)]
    countries: Vec<String>,
    min_days: Option<u32>,
    max_days: Option<u32>,
}

fn enabled_by_default() -> bool {
    true
}

impl ShippingMethod {
    fn from_raw(raw: RawMethod, position: usize) -> Option<Self> {
        let kind = raw.kind.parse::<ShippingKind>().ok()?;
        let (default_min, default_max) = kind.default_window();
        let id = match raw.id {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("{}-{position}", raw.kind),
        };
        let min_days = raw.min_days.unwrap_or(default_min);
        Some(Self {
            name: raw.name.unwrap_or_else(|| id.clone()),
            id,
            kind,
            enabled: raw.enabled,
            base_rate: raw.base_rate.as_ref().and_then(decimal_from_json).unwrap_or_default(),
            per_kg_rate: raw
                .per_kg_rate
                .as_ref()
                .and_then(decimal_from_json)
                .unwrap_or_default(),
            free_threshold: raw.free_threshold.as_ref().and_then(decimal_from_json),
            max_weight: raw.max_weight.as_ref().and_then(decimal_from_json),
            countries: raw.countries,
            min_days,
            max_days: raw.max_days.unwrap_or(default_max).max(min_days),
        })
    }
}

/// Decodes the `shipping_methods` settings value. Entries that do not decode
/// or use an unsupported type are skipped.
pub fn decode_methods(value: Option<&Value>) -> Vec<ShippingMethod> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let raw = serde_json::from_value::<RawMethod>(item.clone()).ok()?;
            ShippingMethod::from_raw(raw, position)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DeliveryWindow {
    pub min_days: u32,
    pub max_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ShippingOption {
    pub id: String,
    pub name: String,
    pub kind: ShippingKind,
    pub price: Decimal,
    pub estimated_delivery: DeliveryWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ShippingQuote {
    pub methods: Vec<ShippingOption>,
    /// `None` means no shipping is available for this cart.
    pub recommended: Option<String>,
    pub total_weight: Decimal,
    pub subtotal: Decimal,
}

impl ShippingQuote {
    pub fn option(&self, id: &str) -> Option<&ShippingOption> {
        self.methods.iter().find(|m| m.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cart amounts are out of range")]
pub struct AmountOverflow;

pub fn cart_subtotal(lines: &[CartLine]) -> Result<Decimal, AmountOverflow> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        line.price
            .checked_mul(Decimal::from(line.quantity.max(0)))
            .and_then(|amount| acc.checked_add(amount))
            .ok_or(AmountOverflow)
    })
}

pub fn total_weight<W: WeightModel + ?Sized>(
    lines: &[CartLine],
    model: &W,
) -> Result<Decimal, AmountOverflow> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        model
            .line_weight(line)
            .and_then(|weight| acc.checked_add(weight))
            .ok_or(AmountOverflow)
    })
}

pub fn quote<W: WeightModel + ?Sized>(
    lines: &[CartLine],
    methods: &[ShippingMethod],
    destination: Option<&Destination>,
    model: &W,
) -> Result<ShippingQuote, AmountOverflow> {
    let subtotal = cart_subtotal(lines)?;
    let weight = total_weight(lines, model)?;

    let options: Vec<ShippingOption> = methods
        .iter()
        .filter(|method| method.enabled && ships_to(method, destination))
        .filter_map(|method| price_for(method, subtotal, weight).map(|price| (method, price)))
        .map(|(method, price)| ShippingOption {
            id: method.id.clone(),
            name: method.name.clone(),
            kind: method.kind,
            price,
            estimated_delivery: DeliveryWindow {
                min_days: method.min_days,
                max_days: method.max_days,
            },
        })
        .collect();

    let mut recommended: Option<&ShippingOption> = None;
    for option in &options {
        if recommended.is_none_or(|best| option.price < best.price) {
            recommended = Some(option);
        }
    }
    let recommended = recommended.map(|o| o.id.clone());

    Ok(ShippingQuote {
        methods: options,
        recommended,
        total_weight: weight,
        subtotal,
    })
}

/// `None` when the method cannot carry this cart, including a rate that
/// overflows.
fn price_for(method: &ShippingMethod, subtotal: Decimal, weight: Decimal) -> Option<Decimal> {
    let free = method
        .free_threshold
        .is_some_and(|threshold| subtotal >= threshold);

    match method.kind {
        ShippingKind::WeightBased => {
            if method.max_weight.is_some_and(|max| weight > max) {
                return None;
            }
            if free {
                return Some(Decimal::ZERO);
            }
            method
                .per_kg_rate
                .checked_mul(weight)
                .and_then(|by_weight| method.base_rate.checked_add(by_weight))
        }
        ShippingKind::FlatRate => Some(if free { Decimal::ZERO } else { method.base_rate }),
        ShippingKind::Free => Some(Decimal::ZERO),
    }
}

fn ships_to(method: &ShippingMethod, destination: Option<&Destination>) -> bool {
    if method.countries.is_empty() {
        return true;
    }
    match destination.and_then(|d| d.country.as_deref()) {
        Some(country) => method
            .countries
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(country)),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(price: i64, quantity: i32) -> CartLine {
        CartLine {
            product_id: None,
            variant_id: None,
            price: Decimal::new(price, 0),
            quantity,
            weight: None,
        }
    }

    fn quoted(
        lines: &[CartLine],
        configured: &[ShippingMethod],
        destination: Option<&Destination>,
        model: &dyn WeightModel,
    ) -> ShippingQuote {
        quote(lines, configured, destination, model).expect("amounts in range")
    }

    fn methods(value: Value) -> Vec<ShippingMethod> {
        decode_methods(Some(&value))
    }

    #[test]
    fn flat_rate_becomes_free_over_threshold() {
        let configured = methods(json!([
            {"id": "std", "type": "flat_rate", "base_rate": 10, "free_threshold": 100}
        ]));
        let quote = quoted(&[line(60, 2)], &configured, None, &NominalWeight::default());

        assert_eq!(quote.subtotal, Decimal::new(120, 0));
        assert_eq!(quote.methods.len(), 1);
        assert_eq!(quote.methods[0].price, Decimal::ZERO);
        assert_eq!(quote.recommended.as_deref(), Some("std"));
    }

    #[test]
    fn weight_based_pricing_threshold_and_cap() {
        let configured = methods(json!([
            {"id": "kg", "type": "weight_based", "base_rate": 5, "per_kg_rate": 2,
             "free_threshold": 500, "max_weight": 3}
        ]));
        let model = NominalWeight::default();

        // 4 units -> 2.0 weight -> 5 + 2*2
        let q = quoted(&[line(10, 4)], &configured, None, &model);
        assert_eq!(q.total_weight, Decimal::new(20, 1));
        assert_eq!(q.methods[0].price, Decimal::new(9, 0));

        // over the threshold, free regardless of weight
        let q = quoted(&[line(250, 2)], &configured, None, &model);
        assert_eq!(q.methods[0].price, Decimal::ZERO);

        // 8 units -> 4.0 weight > max 3 -> excluded
        let q = quoted(&[line(1, 8)], &configured, None, &model);
        assert!(q.methods.is_empty());
        assert!(q.recommended.is_none());
    }

    #[test]
    fn unknown_and_disabled_methods_are_skipped() {
        let configured = methods(json!([
            {"id": "pigeon", "type": "carrier_pigeon", "base_rate": 1},
            {"id": "off", "type": "flat_rate", "base_rate": 1, "enabled": false},
            "not an object",
            {"id": "free", "type": "free"}
        ]));
        assert_eq!(configured.len(), 2);
        let q = quoted(&[line(5, 1)], &configured, None, &NominalWeight::default());
        assert_eq!(q.methods.len(), 1);
        assert_eq!(q.methods[0].id, "free");
        assert_eq!(q.methods[0].estimated_delivery.max_days, 14);
    }

    #[test]
    fn recommendation_is_lowest_with_first_seen_tie_break() {
        let configured = methods(json!([
            {"id": "a", "type": "flat_rate", "base_rate": 7},
            {"id": "b", "type": "flat_rate", "base_rate": 4},
            {"id": "c", "type": "weight_based", "base_rate": 3, "per_kg_rate": 2}
        ]));
        let q = quoted(&[line(5, 1)], &configured, None, &NominalWeight::default());
        // c = 3 + 2*0.5 = 4, ties with b, b was seen first
        assert_eq!(q.recommended.as_deref(), Some("b"));
        let best = q.option("b").map(|o| o.price).unwrap_or_default();
        assert!(q.methods.iter().all(|m| best <= m.price));
    }

    #[test]
    fn declared_weight_overrides_nominal() {
        let mut heavy = line(1, 2);
        heavy.weight = Some(Decimal::new(3, 0));
        let lines = [heavy, line(1, 2)];
        assert_eq!(total_weight(&lines, &NominalWeight::default()), Ok(Decimal::new(2, 0)));
        assert_eq!(total_weight(&lines, &DeclaredWeight::default()), Ok(Decimal::new(7, 0)));
    }

    #[test]
    fn country_restriction_applies_only_with_destination() {
        let configured = methods(json!([
            {"id": "local", "type": "flat_rate", "base_rate": 3, "countries": ["CR"]}
        ]));
        let model = NominalWeight::default();
        let abroad = Destination {
            country: Some("US".into()),
            ..Default::default()
        };
        let home = Destination {
            country: Some("cr".into()),
            ..Default::default()
        };
        assert!(quoted(&[line(1, 1)], &configured, Some(&abroad), &model).methods.is_empty());
        assert_eq!(quoted(&[line(1, 1)], &configured, Some(&home), &model).methods.len(), 1);
        assert_eq!(quoted(&[line(1, 1)], &configured, None, &model).methods.len(), 1);
    }

    #[test]
    fn overflowing_price_is_an_error_not_a_panic() {
        let configured = methods(json!([{"id": "free", "type": "free"}]));
        let mut huge = line(1, 2);
        huge.price = Decimal::MAX;
        let model = NominalWeight::default();

        assert_eq!(cart_subtotal(&[huge.clone()]), Err(AmountOverflow));
        assert_eq!(quote(&[huge], &configured, None, &model).err(), Some(AmountOverflow));

        let mut heavy = line(1, 2);
        heavy.weight = Some(Decimal::MAX);
        assert_eq!(total_weight(&[heavy], &DeclaredWeight::default()), Err(AmountOverflow));
    }

    #[test]
    fn overflowing_weight_rate_excludes_the_method() {
        let configured = methods(json!([
            {"id": "kg", "type": "weight_based", "base_rate": 1,
             "per_kg_rate": "79228162514264337593543950335"},
            {"id": "flat", "type": "flat_rate", "base_rate": 4}
        ]));
        let q = quoted(&[line(1, 4)], &configured, None, &NominalWeight::default());
        assert_eq!(q.methods.len(), 1);
        assert_eq!(q.recommended.as_deref(), Some("flat"));
    }
}
