//! Payment-gateway events reduced to the subscription changes they imply.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::plans::{Plan, PlanTable};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_PAST_DUE: &str = "past_due";
pub const STATUS_CANCELED: &str = "canceled";

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Partial update to a local subscription. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionPatch {
    pub status: Option<String>,
    pub plan: Option<Plan>,
    pub cancel_at_period_end: Option<bool>,
    pub period: Option<Period>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BillingAction {
    /// Subscription checkout finished for a tenant.
    Activate {
        tenant_id: Uuid,
        plan: Plan,
        gateway_customer_id: Option<String>,
        gateway_subscription_id: String,
    },
    /// Mirror gateway state onto an existing subscription.
    Patch {
        gateway_subscription_id: String,
        patch: SubscriptionPatch,
    },
    /// Subscription ended; the owning tenant drops to the starter plan.
    Cancel { gateway_subscription_id: String },
    Ignore { reason: String },
}

impl BillingAction {
    fn ignore(reason: impl Into<String>) -> Self {
        BillingAction::Ignore {
            reason: reason.into(),
        }
    }
}

/// Maps an event onto the local change it calls for.
pub fn interpret(event: &GatewayEvent, plans: &PlanTable) -> BillingAction {
    let object = &event.data.object;
    match event.kind.as_str() {
        "checkout.session.completed" => checkout_completed(object, plans),
        "invoice.paid" | "invoice.payment_succeeded" => match invoice_subscription(object) {
            Some(id) => BillingAction::Patch {
                gateway_subscription_id: id,
                patch: SubscriptionPatch {
                    status: Some(STATUS_ACTIVE.to_string()),
                    period: invoice_period(object),
                    ..Default::default()
                },
            },
            None => BillingAction::ignore("invoice without subscription"),
        },
        "invoice.payment_failed" => match invoice_subscription(object) {
            Some(id) => BillingAction::Patch {
                gateway_subscription_id: id,
                patch: SubscriptionPatch {
                    status: Some(STATUS_PAST_DUE.to_string()),
                    ..Default::default()
                },
            },
            None => BillingAction::ignore("invoice without subscription"),
        },
        "customer.subscription.updated" => match str_field(object, "id") {
            Some(id) => BillingAction::Patch {
                gateway_subscription_id: id,
                patch: SubscriptionPatch {
                    status: str_field(object, "status"),
                    plan: subscription_price(object).and_then(|price| plans.lookup(&price)),
                    cancel_at_period_end: object.get("cancel_at_period_end").and_then(Value::as_bool),
                    period: subscription_period(object),
                },
            },
            None => BillingAction::ignore("subscription without id"),
        },
        "customer.subscription.deleted" => match str_field(object, "id") {
            Some(id) => BillingAction::Cancel {
                gateway_subscription_id: id,
            },
            None => BillingAction::ignore("subscription without id"),
        },
        other => BillingAction::ignore(format!("unhandled event type {other}")),
    }
}

fn checkout_completed(object: &Value, plans: &PlanTable) -> BillingAction {
    if object.get("mode").and_then(Value::as_str) != Some("subscription") {
        return BillingAction::ignore("checkout is not a subscription");
    }
    let metadata = object.get("metadata");
    let tenant_id = metadata
        .and_then(|m| m.get("tenant_id"))
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok());
    let Some(tenant_id) = tenant_id else {
        return BillingAction::ignore("checkout without tenant metadata");
    };
    let Some(subscription_id) = id_or_expanded(object.get("subscription")) else {
        return BillingAction::ignore("checkout without subscription");
    };
    let price_id = metadata
        .and_then(|m| m.get("price_id"))
        .and_then(Value::as_str);

    BillingAction::Activate {
        tenant_id,
        plan: plans.plan_for(price_id),
        gateway_customer_id: id_or_expanded(object.get("customer")),
        gateway_subscription_id: subscription_id,
    }
}

fn str_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reference fields arrive either as a bare id or as the expanded object.
fn id_or_expanded(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn invoice_subscription(invoice: &Value) -> Option<String> {
    id_or_expanded(invoice.get("subscription")).or_else(|| {
        invoice
            .pointer("/parent/subscription_details/subscription")
            .and_then(|v| id_or_expanded(Some(v)))
    })
}

fn invoice_period(invoice: &Value) -> Option<Period> {
    period_from(invoice.pointer("/lines/data/0/period/start"), invoice.pointer("/lines/data/0/period/end"))
}

fn subscription_period(subscription: &Value) -> Option<Period> {
    period_from(
        subscription.get("current_period_start"),
        subscription.get("current_period_end"),
    )
    .or_else(|| {
        period_from(
            subscription.pointer("/items/data/0/current_period_start"),
            subscription.pointer("/items/data/0/current_period_end"),
        )
    })
}

fn subscription_price(subscription: &Value) -> Option<String> {
    subscription
        .pointer("/items/data/0/price/id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn period_from(start: Option<&Value>, end: Option<&Value>) -> Option<Period> {
    let start = DateTime::from_timestamp(start?.as_i64()?, 0)?;
    let end = DateTime::from_timestamp(end?.as_i64()?, 0)?;
    Some(Period { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: &str, object: Value) -> GatewayEvent {
        GatewayEvent {
            id: "evt_1".into(),
            kind: kind.into(),
            data: EventData { object },
        }
    }

    fn plans() -> PlanTable {
        PlanTable::new().with_price("price_pro", Plan::Pro)
    }

    #[test]
    fn checkout_maps_price_to_plan() {
        let tenant = Uuid::new_v4();
        let action = interpret(
            &event(
                "checkout.session.completed",
                json!({
                    "mode": "subscription",
                    "customer": "cus_1",
                    "subscription": "sub_1",
                    "metadata": { "tenant_id": tenant.to_string(), "price_id": "price_pro" }
                }),
            ),
            &plans(),
        );
        assert_eq!(
            action,
            BillingAction::Activate {
                tenant_id: tenant,
                plan: Plan::Pro,
                gateway_customer_id: Some("cus_1".into()),
                gateway_subscription_id: "sub_1".into(),
            }
        );
    }

    #[test]
    fn unknown_price_falls_back_to_starter() {
        let tenant = Uuid::new_v4();
        let action = interpret(
            &event(
                "checkout.session.completed",
                json!({
                    "mode": "subscription",
                    "subscription": { "id": "sub_2" },
                    "metadata": { "tenant_id": tenant.to_string(), "price_id": "price_mystery" }
                }),
            ),
            &plans(),
        );
        assert!(matches!(action, BillingAction::Activate { plan: Plan::Starter, .. }));
    }

    #[test]
    fn payment_mode_checkout_is_ignored() {
        let action = interpret(
            &event("checkout.session.completed", json!({ "mode": "payment" })),
            &plans(),
        );
        assert!(matches!(action, BillingAction::Ignore { .. }));
    }

    #[test]
    fn invoice_paid_takes_first_line_period() {
        let action = interpret(
            &event(
                "invoice.paid",
                json!({
                    "subscription": "sub_1",
                    "lines": { "data": [ { "period": { "start": 1_700_000_000, "end": 1_702_592_000 } } ] }
                }),
            ),
            &plans(),
        );
        let BillingAction::Patch { gateway_subscription_id, patch } = action else {
            panic!("expected patch");
        };
        assert_eq!(gateway_subscription_id, "sub_1");
        assert_eq!(patch.status.as_deref(), Some(STATUS_ACTIVE));
        assert_eq!(patch.period.map(|p| p.start.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn failed_payment_marks_past_due() {
        let action = interpret(
            &event("invoice.payment_failed", json!({ "subscription": "sub_1" })),
            &plans(),
        );
        assert!(matches!(
            action,
            BillingAction::Patch { ref patch, .. } if patch.status.as_deref() == Some(STATUS_PAST_DUE)
        ));
    }

    #[test]
    fn subscription_update_mirrors_flags() {
        let action = interpret(
            &event(
                "customer.subscription.updated",
                json!({
                    "id": "sub_1",
                    "status": "active",
                    "cancel_at_period_end": true,
                    "items": { "data": [ {
                        "price": { "id": "price_pro" },
                        "current_period_start": 10,
                        "current_period_end": 20
                    } ] }
                }),
            ),
            &plans(),
        );
        let BillingAction::Patch { patch, .. } = action else {
            panic!("expected patch");
        };
        assert_eq!(patch.cancel_at_period_end, Some(true));
        assert_eq!(patch.plan, Some(Plan::Pro));
        assert_eq!(patch.period.map(|p| p.end.timestamp()), Some(20));
    }

    #[test]
    fn unknown_events_are_ignored() {
        let action = interpret(&event("charge.refunded", json!({})), &plans());
        assert!(matches!(action, BillingAction::Ignore { .. }));
    }
}
