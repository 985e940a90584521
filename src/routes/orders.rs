use axum::{Json, Router, extract::State, routing::post};
use validator::Validate;

use crate::{
    dto::orders::{CreateOrderRequest, OrderCreated},
    error::AppResult,
    middleware::{auth::MaybeAuthUser, tenant::TenantContext},
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_order))
}

/// Guest or signed-in checkout. Line-item and stock failures are reported
/// in `reconciliation`; the order itself is already committed.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = ApiResponse<OrderCreated>),
        (status = 400, description = "Invalid order"),
        (status = 404, description = "Unknown store"),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    ctx: TenantContext,
    MaybeAuthUser(shopper): MaybeAuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderCreated>>> {
    payload.validate()?;
    let resp = order_service::create_order(&state, &ctx, shopper.as_ref(), payload).await?;
    Ok(Json(resp))
}
