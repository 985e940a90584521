use std::future::Future;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        billing::{BillingAction, GatewayEvent, STATUS_ACTIVE, STATUS_CANCELED, SubscriptionPatch, interpret},
        plans::{Plan, PlanTable},
        signature::{self, DEFAULT_TOLERANCE_SECS, SignatureError},
    },
    entity::{
        subscriptions::{
            ActiveModel as SubscriptionActive, Column as SubscriptionCol, Entity as Subscriptions,
        },
        tenants::{ActiveModel as TenantActive, Entity as Tenants},
        webhook_events::{ActiveModel as WebhookEventActive, Entity as WebhookEvents},
    },
    error::{AppError, AppResult},
    models::Subscription,
};

/// Body returned to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self {
            received: true,
            duplicate: false,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            received: true,
            duplicate: true,
        }
    }
}

/// Persistence the reconciler needs. Every write is keyed so that replaying
/// it converges on the same state.
pub trait BillingStore {
    fn is_processed(&self, event_id: &str) -> impl Future<Output = AppResult<bool>> + Send;

    fn mark_processed(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> impl Future<Output = AppResult<()>> + Send;

    /// `false` when the tenant does not exist.
    fn set_tenant_plan(
        &self,
        tenant_id: Uuid,
        plan: Plan,
        gateway_customer_id: Option<String>,
    ) -> impl Future<Output = AppResult<bool>> + Send;

    fn upsert_subscription(
        &self,
        tenant_id: Uuid,
        gateway_subscription_id: &str,
        gateway_customer_id: Option<String>,
        patch: SubscriptionPatch,
    ) -> impl Future<Output = AppResult<Subscription>> + Send;

    /// `None` when no local subscription carries that gateway id.
    fn patch_subscription(
        &self,
        gateway_subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> impl Future<Output = AppResult<Option<Subscription>>> + Send;
}

/// Rejects anything not signed with the endpoint secret.
pub fn verify_signature(payload: &[u8], header: Option<&str>, secret: &str) -> AppResult<()> {
    let header = header.ok_or_else(|| AppError::BadRequest("missing signature header".into()))?;
    match signature::verify(payload, header, secret, Utc::now().timestamp(), DEFAULT_TOLERANCE_SECS) {
        Ok(()) => Ok(()),
        Err(SignatureError::MissingSecret) => Err(AppError::Internal(anyhow::anyhow!(
            "STRIPE_WEBHOOK_SECRET is not configured"
        ))),
        Err(err) => {
            tracing::warn!(error = %err, "webhook signature rejected");
            Err(AppError::BadRequest(err.to_string()))
        }
    }
}

pub fn parse_event(payload: &[u8]) -> AppResult<GatewayEvent> {
    serde_json::from_slice(payload)
        .map_err(|err| AppError::BadRequest(format!("invalid event payload: {err}")))
}

/// Applies one verified event. Redelivered ids short-circuit on the ledger.
pub async fn process_event<S>(store: &S, plans: &PlanTable, event: &GatewayEvent) -> AppResult<WebhookAck>
where
    S: BillingStore + Sync,
{
    if store.is_processed(&event.id).await? {
        tracing::info!(event_id = %event.id, event_type = %event.kind, "duplicate webhook event");
        return Ok(WebhookAck::duplicate());
    }

    match interpret(event, plans) {
        BillingAction::Activate {
            tenant_id,
            plan,
            gateway_customer_id,
            gateway_subscription_id,
        } => {
            if !store
                .set_tenant_plan(tenant_id, plan, gateway_customer_id.clone())
                .await?
            {
                tracing::warn!(event_id = %event.id, %tenant_id, "checkout for unknown tenant");
            } else {
                store
                    .upsert_subscription(
                        tenant_id,
                        &gateway_subscription_id,
                        gateway_customer_id,
                        SubscriptionPatch {
                            status: Some(STATUS_ACTIVE.to_string()),
                            plan: Some(plan),
                            ..Default::default()
                        },
                    )
                    .await?;
                tracing::info!(event_id = %event.id, %tenant_id, %plan, "subscription activated");
            }
        }
        BillingAction::Patch {
            gateway_subscription_id,
            patch,
        } => {
            let plan_change = patch.plan;
            match store.patch_subscription(&gateway_subscription_id, patch).await? {
                Some(subscription) => {
                    if let Some(plan) = plan_change {
                        store
                            .set_tenant_plan(subscription.tenant_id, plan, None)
                            .await?;
                    }
                    tracing::info!(
                        event_id = %event.id,
                        tenant_id = %subscription.tenant_id,
                        status = %subscription.status,
                        "subscription updated"
                    );
                }
                None => tracing::warn!(
                    event_id = %event.id,
                    subscription = %gateway_subscription_id,
                    "event for unknown subscription"
                ),
            }
        }
        BillingAction::Cancel {
            gateway_subscription_id,
        } => {
            let patch = SubscriptionPatch {
                status: Some(STATUS_CANCELED.to_string()),
                ..Default::default()
            };
            match store.patch_subscription(&gateway_subscription_id, patch).await? {
                Some(subscription) => {
                    store
                        .set_tenant_plan(subscription.tenant_id, Plan::Starter, None)
                        .await?;
                    tracing::info!(
                        event_id = %event.id,
                        tenant_id = %subscription.tenant_id,
                        "subscription canceled, tenant moved to starter"
                    );
                }
                None => tracing::warn!(
                    event_id = %event.id,
                    subscription = %gateway_subscription_id,
                    "cancellation for unknown subscription"
                ),
            }
        }
        BillingAction::Ignore { reason } => {
            tracing::debug!(event_id = %event.id, event_type = %event.kind, %reason, "webhook ignored");
        }
    }

    store.mark_processed(&event.id, &event.kind).await?;
    Ok(WebhookAck::received())
}

fn apply_patch(active: &mut SubscriptionActive, patch: SubscriptionPatch) {
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    if let Some(plan) = patch.plan {
        active.plan = Set(plan.as_str().to_string());
    }
    if let Some(flag) = patch.cancel_at_period_end {
        active.cancel_at_period_end = Set(flag);
    }
    if let Some(period) = patch.period {
        active.current_period_start = Set(Some(period.start.into()));
        active.current_period_end = Set(Some(period.end.into()));
    }
    active.updated_at = Set(Utc::now().into());
}

impl BillingStore for DatabaseConnection {
    async fn is_processed(&self, event_id: &str) -> AppResult<bool> {
        let found = WebhookEvents::find_by_id(event_id.to_string()).one(self).await?;
        Ok(found.is_some())
    }

    async fn mark_processed(&self, event_id: &str, event_type: &str) -> AppResult<()> {
        // a concurrent delivery may have recorded it first
        if self.is_processed(event_id).await? {
            return Ok(());
        }
        WebhookEventActive {
            event_id: Set(event_id.to_string()),
            event_type: Set(event_type.to_string()),
            processed_at: Set(Utc::now().into()),
        }
        .insert(self)
        .await?;
        Ok(())
    }

    async fn set_tenant_plan(
        &self,
        tenant_id: Uuid,
        plan: Plan,
        gateway_customer_id: Option<String>,
    ) -> AppResult<bool> {
        let Some(tenant) = Tenants::find_by_id(tenant_id).one(self).await? else {
            return Ok(false);
        };
        let mut active: TenantActive = tenant.into();
        active.plan = Set(plan.as_str().to_string());
        if let Some(customer) = gateway_customer_id {
            active.gateway_customer_id = Set(Some(customer));
        }
        active.updated_at = Set(Utc::now().into());
        active.update(self).await?;
        Ok(true)
    }

    async fn upsert_subscription(
        &self,
        tenant_id: Uuid,
        gateway_subscription_id: &str,
        gateway_customer_id: Option<String>,
        patch: SubscriptionPatch,
    ) -> AppResult<Subscription> {
        let existing = Subscriptions::find()
            .filter(SubscriptionCol::GatewaySubscriptionId.eq(gateway_subscription_id))
            .one(self)
            .await?;

        let saved = match existing {
            Some(row) => {
                let mut active: SubscriptionActive = row.into();
                active.tenant_id = Set(tenant_id);
                if gateway_customer_id.is_some() {
                    active.gateway_customer_id = Set(gateway_customer_id);
                }
                apply_patch(&mut active, patch);
                active.update(self).await?
            }
            None => {
                let now = Utc::now();
                let mut active = SubscriptionActive {
                    id: Set(Uuid::new_v4()),
                    tenant_id: Set(tenant_id),
                    gateway_subscription_id: Set(gateway_subscription_id.to_string()),
                    gateway_customer_id: Set(gateway_customer_id),
                    plan: Set(Plan::Starter.as_str().to_string()),
                    status: Set(STATUS_ACTIVE.to_string()),
                    current_period_start: Set(None),
                    current_period_end: Set(None),
                    cancel_at_period_end: Set(false),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                apply_patch(&mut active, patch);
                active.insert(self).await?
            }
        };
        Ok(Subscription::from(saved))
    }

    async fn patch_subscription(
        &self,
        gateway_subscription_id: &str,
        patch: SubscriptionPatch,
    ) -> AppResult<Option<Subscription>> {
        let existing = Subscriptions::find()
            .filter(SubscriptionCol::GatewaySubscriptionId.eq(gateway_subscription_id))
            .one(self)
            .await?;
        let Some(row) = existing else {
            return Ok(None);
        };
        let mut active: SubscriptionActive = row.into();
        apply_patch(&mut active, patch);
        let saved = active.update(self).await?;
        Ok(Some(Subscription::from(saved)))
    }
}
