//! The two independent order state machines.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FinancialStatus {
    Pending,
    Paid,
    Refunded,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Unfulfilled,
    Partial,
    Fulfilled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move {axis} status from {from} to {to}")]
pub struct TransitionError {
    pub axis: &'static str,
    pub from: String,
    pub to: String,
}

impl FinancialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancialStatus::Pending => "pending",
            FinancialStatus::Paid => "paid",
            FinancialStatus::Refunded => "refunded",
            FinancialStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: FinancialStatus) -> bool {
        use FinancialStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Paid) | (Paid, Refunded) | (Pending, Cancelled)
            )
    }

    pub fn transition(self, next: FinancialStatus) -> Result<FinancialStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                axis: "financial",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Unfulfilled => "unfulfilled",
            FulfillmentStatus::Partial => "partial",
            FulfillmentStatus::Fulfilled => "fulfilled",
        }
    }

    pub fn can_transition_to(self, next: FulfillmentStatus) -> bool {
        use FulfillmentStatus::*;
        self == next
            || matches!(
                (self, next),
                (Unfulfilled, Partial) | (Partial, Fulfilled) | (Unfulfilled, Fulfilled)
            )
    }

    pub fn transition(self, next: FulfillmentStatus) -> Result<FulfillmentStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                axis: "fulfillment",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for FinancialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinancialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FinancialStatus::Pending),
            "paid" => Ok(FinancialStatus::Paid),
            "refunded" => Ok(FinancialStatus::Refunded),
            "cancelled" => Ok(FinancialStatus::Cancelled),
            other => Err(format!("unknown financial status '{other}'")),
        }
    }
}

impl FromStr for FulfillmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unfulfilled" => Ok(FulfillmentStatus::Unfulfilled),
            "partial" => Ok(FulfillmentStatus::Partial),
            "fulfilled" => Ok(FulfillmentStatus::Fulfilled),
            other => Err(format!("unknown fulfillment status '{other}'")),
        }
    }
}

/// `ORD-YYYYMMDD-HHMMSS-XXXX`. Assigned once at creation, never rewritten.
pub fn order_number(now: DateTime<Utc>, entropy: &str) -> String {
    let suffix: String = entropy
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(4)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("ORD-{}-{:0<4}", now.format("%Y%m%d-%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn order_number_layout() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(order_number(at, "a1-b2c3"), "ORD-20250309-070502-A1B2");
        assert_eq!(order_number(at, "z"), "ORD-20250309-070502-Z000");
    }

    #[test]
    fn financial_happy_paths() {
        let paid = FinancialStatus::Pending.transition(FinancialStatus::Paid).unwrap();
        assert_eq!(paid.transition(FinancialStatus::Refunded), Ok(FinancialStatus::Refunded));
        assert!(FinancialStatus::Pending.can_transition_to(FinancialStatus::Cancelled));
    }

    #[test]
    fn financial_rejects_backwards_moves() {
        let err = FinancialStatus::Refunded
            .transition(FinancialStatus::Paid)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot move financial status from refunded to paid");
        assert!(!FinancialStatus::Cancelled.can_transition_to(FinancialStatus::Paid));
        assert!(!FinancialStatus::Paid.can_transition_to(FinancialStatus::Cancelled));
    }

    #[test]
    fn fulfillment_moves_forward_only() {
        assert!(FulfillmentStatus::Unfulfilled.can_transition_to(FulfillmentStatus::Partial));
        assert!(FulfillmentStatus::Partial.can_transition_to(FulfillmentStatus::Fulfilled));
        assert!(!FulfillmentStatus::Fulfilled.can_transition_to(FulfillmentStatus::Partial));
    }

    #[test]
    fn same_state_is_a_no_op() {
        assert!(FinancialStatus::Paid.can_transition_to(FinancialStatus::Paid));
        assert!(FulfillmentStatus::Partial.can_transition_to(FulfillmentStatus::Partial));
    }

    #[test]
    fn parse_round_trips_labels() {
        assert_eq!("paid".parse::<FinancialStatus>(), Ok(FinancialStatus::Paid));
        assert!("shipped".parse::<FulfillmentStatus>().is_err());
    }
}
