use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use storefront_platform::{
    domain::{
        billing::{GatewayEvent, STATUS_CANCELED, SubscriptionPatch},
        plans::{Plan, PlanTable},
    },
    error::AppResult,
    models::Subscription,
    services::billing_service::{BillingStore, WebhookAck, parse_event, process_event},
};
use uuid::Uuid;

#[derive(Default)]
struct Ledger {
    processed: HashSet<String>,
    plans: HashMap<Uuid, Plan>,
    subscriptions: HashMap<String, Subscription>,
}

#[derive(Default)]
struct MemoryStore {
    inner: Mutex<Ledger>,
}

impl MemoryStore {
    fn with_tenant(tenant_id: Uuid, plan: Plan) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().plans.insert(tenant_id, plan);
        store
    }

    fn snapshot(&self) -> (Option<Plan>, Option<Subscription>, usize) {
        let ledger = self.inner.lock().unwrap();
        let tenant = ledger.plans.values().next().copied();
        let sub = ledger.subscriptions.values().next().cloned();
        (tenant, sub, ledger.processed.len())
    }
}

fn apply(sub: &mut Subscription, patch: SubscriptionPatch) {
    if let Some(status) = patch.status {
        sub.status = status;
    }
    if let Some(plan) = patch.plan {
        sub.plan = plan;
    }
    if let Some(flag) = patch.cancel_at_period_end {
        sub.cancel_at_period_end = flag;
    }
    if let Some(period) = patch.period {
        sub.current_period_start = Some(period.start);
        sub.current_period_end = Some(period.end);
    }
}

impl BillingStore for MemoryStore {
    async fn is_processed(&self, event_id: &str) -> AppResult<bool> {
        Ok(self.inner.lock().unwrap().processed.contains(event_id))
    }

    async fn mark_processed(&self, event_id: &str, _event_type: &str) -> AppResult<()> {
        self.inner.lock().unwrap().processed.insert(event_id.to_string());
        Ok(())
    }

    async fn set_tenant_plan(
        &self,
        tenant_id: Uuid,
        plan: Plan,
        _gateway_customer_id: Option<String>,
    ) -> AppResult<bool> {
        let mut ledger = self.inner.lock().unwrap();
        match ledger.plans.get_mut(&tenant_id) {
            Some(current) => {
                *current = plan;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_subscription(
        &self,
        tenant_id: Uuid,
        gateway_subscription_id: &str,
        gateway_customer_id: Option<String>,
        patch: SubscriptionPatch,
    ) -> AppResult<Subscription> {
        let mut ledger = self.inner.lock().unwrap();
        let sub = ledger
            .subscriptions
            .entry(gateway_subscription_id.to_string())
            .or_insert_with(|| Subscription {
                id: Uuid::new_v4(),
                tenant_id,
                gateway_subscription_id: gateway_subscription_id.to_string(),
                gateway_customer_id: gateway_customer_id.clone(),
                plan: Plan::Starter,
                status: "active".into(),
                current_period_start: None,
                current_period_end: None,
                cancel_at_period_end: false,
            });
        apply(sub, patch);
        Ok(sub.clone())
    }

    async fn patch_subscription(
        &self,
        gateway_subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> AppResult<Option<Subscription>> {
        let mut ledger = self.inner.lock().unwrap();
        Ok(ledger.subscriptions.get_mut(gateway_subscription_id).map(|sub| {
            apply(sub, patch);
            sub.clone()
        }))
    }
}

fn plans() -> PlanTable {
    PlanTable::new()
        .with_price("price_pro", Plan::Pro)
        .with_price("price_ent", Plan::Enterprise)
}

fn event(json: serde_json::Value) -> GatewayEvent {
    parse_event(json.to_string().as_bytes()).unwrap()
}

fn checkout(tenant_id: Uuid) -> GatewayEvent {
    event(serde_json::json!({
        "id": "evt_checkout",
        "type": "checkout.session.completed",
        "data": { "object": {
            "mode": "subscription",
            "customer": "cus_1",
            "subscription": "sub_1",
            "metadata": { "tenant_id": tenant_id.to_string(), "price_id": "price_pro" }
        }}
    }))
}

fn deleted() -> GatewayEvent {
    event(serde_json::json!({
        "id": "evt_deleted",
        "type": "customer.subscription.deleted",
        "data": { "object": { "id": "sub_1", "status": "canceled" } }
    }))
}

#[tokio::test]
async fn checkout_then_cancel_moves_tenant_back_to_starter() -> anyhow::Result<()> {
    let tenant_id = Uuid::new_v4();
    let store = MemoryStore::with_tenant(tenant_id, Plan::Starter);

    process_event(&store, &plans(), &checkout(tenant_id)).await?;
    let (plan, sub, _) = store.snapshot();
    assert_eq!(plan, Some(Plan::Pro));
    assert_eq!(sub.map(|s| s.plan), Some(Plan::Pro));

    process_event(&store, &plans(), &deleted()).await?;
    let (plan, sub, processed) = store.snapshot();
    assert_eq!(plan, Some(Plan::Starter));
    assert_eq!(sub.map(|s| s.status), Some(STATUS_CANCELED.to_string()));
    assert_eq!(processed, 2);
    Ok(())
}

#[tokio::test]
async fn redelivered_event_leaves_state_unchanged() -> anyhow::Result<()> {
    let tenant_id = Uuid::new_v4();
    let store = MemoryStore::with_tenant(tenant_id, Plan::Starter);

    let first = process_event(&store, &plans(), &checkout(tenant_id)).await?;
    assert_eq!(first, WebhookAck::received());
    process_event(&store, &plans(), &deleted()).await?;
    let before = store.snapshot();

    let replay = process_event(&store, &plans(), &deleted()).await?;
    assert_eq!(replay, WebhookAck::duplicate());
    let replay_checkout = process_event(&store, &plans(), &checkout(tenant_id)).await?;
    assert_eq!(replay_checkout, WebhookAck::duplicate());

    assert_eq!(store.snapshot(), before);
    Ok(())
}

#[tokio::test]
async fn events_for_unknown_records_are_acknowledged() -> anyhow::Result<()> {
    let store = MemoryStore::default();

    let ack = process_event(&store, &plans(), &checkout(Uuid::new_v4())).await?;
    assert_eq!(ack, WebhookAck::received());
    let ack = process_event(&store, &plans(), &deleted()).await?;
    assert_eq!(ack, WebhookAck::received());

    let (plan, sub, processed) = store.snapshot();
    assert!(plan.is_none());
    assert!(sub.is_none());
    assert_eq!(processed, 2);
    Ok(())
}
