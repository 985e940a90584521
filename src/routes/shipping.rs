use axum::{Json, Router, extract::State, routing::post};
use validator::Validate;

use crate::{
    domain::shipping::ShippingQuote,
    dto::shipping::ShippingQuoteRequest,
    error::AppResult,
    middleware::tenant::TenantContext,
    response::ApiResponse,
    services::shipping_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/quote", post(quote))
}

#[utoipa::path(
    post,
    path = "/api/shipping/quote",
    request_body = ShippingQuoteRequest,
    responses(
        (status = 200, description = "Shipping options for the cart", body = ApiResponse<ShippingQuote>),
        (status = 400, description = "Invalid cart"),
    ),
    tag = "Shipping"
)]
pub async fn quote(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<ShippingQuoteRequest>,
) -> AppResult<Json<ApiResponse<ShippingQuote>>> {
    payload.validate()?;
    let resp = shipping_service::quote_for_cart(&state, &ctx, payload)?;
    Ok(Json(resp))
}
