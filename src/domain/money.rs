use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Largest amount a `NUMERIC(12,2)` column holds: 9 999 999 999.99.
pub const MAX_STORED_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// `price * quantity`, or `None` when the product overflows or would not fit
/// a stored amount column.
pub fn line_amount(price: Decimal, quantity: i32) -> Option<Decimal> {
    price
        .checked_mul(Decimal::from(quantity))
        .filter(|amount| amount.abs() <= MAX_STORED_AMOUNT)
}

/// Renders an amount in the tenant's currency, e.g. `$10` or `₡1250.50`.
///
/// Whole amounts are printed without a fractional part; anything else is
/// rounded to two places.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let number = if rounded.fract().is_zero() {
        rounded.trunc().to_string()
    } else {
        format!("{:.2}", rounded)
    };

    match currency_symbol(currency) {
        Some(symbol) => format!("{symbol}{number}"),
        None => format!("{} {number}", currency.to_uppercase()),
    }
}

/// `$10–$12`, or a single amount when both ends match.
pub fn format_range(min: Decimal, max: Decimal, currency: &str) -> String {
    if min == max {
        return format_amount(min, currency);
    }
    format!(
        "{}\u{2013}{}",
        format_amount(min, currency),
        format_amount(max, currency)
    )
}

/// Reads a JSON number or numeric string; anything else is `None`.
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency.to_uppercase().as_str() {
        "USD" | "MXN" => Some("$"),
        "EUR" => Some("\u{20ac}"),
        "GBP" => Some("\u{a3}"),
        "CRC" => Some("\u{20a1}"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_amounts_drop_the_fraction() {
        assert_eq!(format_amount(Decimal::new(10, 0), "USD"), "$10");
        assert_eq!(format_amount(Decimal::new(1000, 2), "usd"), "$10");
    }

    #[test]
    fn fractional_amounts_keep_two_places() {
        assert_eq!(format_amount(Decimal::new(105, 1), "EUR"), "\u{20ac}10.50");
    }

    #[test]
    fn unknown_currency_uses_code_prefix() {
        assert_eq!(format_amount(Decimal::new(7, 0), "jpy"), "JPY 7");
    }

    #[test]
    fn lenient_json_numbers() {
        assert_eq!(decimal_from_json(&serde_json::json!("12.5")), Some(Decimal::new(125, 1)));
        assert_eq!(decimal_from_json(&serde_json::json!(3)), Some(Decimal::new(3, 0)));
        assert_eq!(decimal_from_json(&serde_json::json!("n/a")), None);
        assert_eq!(decimal_from_json(&serde_json::json!(null)), None);
    }

    #[test]
    fn line_amount_stays_within_column_range() {
        assert_eq!(line_amount(Decimal::new(250, 2), 4), Some(Decimal::new(10, 0)));
        assert_eq!(MAX_STORED_AMOUNT.to_string(), "9999999999.99");
        assert_eq!(line_amount(MAX_STORED_AMOUNT, 1), Some(MAX_STORED_AMOUNT));
        assert_eq!(line_amount(MAX_STORED_AMOUNT, 2), None);
        assert_eq!(line_amount(Decimal::MAX, 2), None);
    }

    #[test]
    fn range_collapses_when_equal() {
        let ten = Decimal::new(10, 0);
        assert_eq!(format_range(ten, ten, "USD"), "$10");
        assert_eq!(
            format_range(ten, Decimal::new(12, 0), "USD"),
            "$10\u{2013}$12"
        );
    }
}
