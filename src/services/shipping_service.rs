use rust_decimal::Decimal;

use crate::{
    domain::shipping::{ShippingQuote, decode_methods, quote},
    dto::shipping::ShippingQuoteRequest,
    error::{AppError, AppResult},
    middleware::tenant::TenantContext,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Quote against the tenant's configured methods. An empty method list is a
/// normal answer, not an error.
pub fn quote_for_cart(
    state: &AppState,
    ctx: &TenantContext,
    payload: ShippingQuoteRequest,
) -> AppResult<ApiResponse<ShippingQuote>> {
    for (index, line) in payload.items.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(format!("item {index}: quantity must be positive")));
        }
        if line.price < Decimal::ZERO {
            return Err(AppError::BadRequest(format!("item {index}: price cannot be negative")));
        }
    }

    let methods = decode_methods(Some(&ctx.tenant.settings.shipping_methods_value()));
    let model = state.config.weight_model();
    let result = quote(&payload.items, &methods, payload.destination.as_ref(), model.as_ref())
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    tracing::debug!(
        tenant_id = %ctx.id(),
        eligible = result.methods.len(),
        recommended = ?result.recommended,
        "shipping quoted"
    );

    let message = if result.methods.is_empty() {
        "No shipping available"
    } else {
        "Shipping quote"
    };
    Ok(ApiResponse::success(message, result, Some(Meta::empty())))
}
