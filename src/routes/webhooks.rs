use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    error::AppResult,
    services::billing_service::{self, WebhookAck},
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// Subscription lifecycle events from the payment gateway. The raw body is
/// needed for signature verification, so it is taken as bytes.
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")),
    request_body(content = String, description = "Raw gateway event", content_type = "application/json"),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Bad signature or payload"),
        (status = 500, description = "Webhook secret not configured"),
    ),
    tag = "Billing"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    billing_service::verify_signature(&body, signature, &state.config.stripe_webhook_secret)?;

    let event = billing_service::parse_event(&body)?;
    tracing::info!(event_id = %event.id, event_type = %event.kind, "webhook received");

    let plans = state.config.plan_table();
    let ack = billing_service::process_event(&state.orm, &plans, &event).await?;
    Ok(Json(ack))
}
