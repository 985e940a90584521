use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, patch},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        customers::{CustomerDetail, CustomerList},
        invitations::{CreateInvitationRequest, InvitationList},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
    },
    error::AppResult,
    middleware::{auth::AuthUser, tenant::TenantContext},
    models::{Invitation, Order},
    response::ApiResponse,
    routes::params::{OrderListQuery, Pagination, SearchQuery},
    services::{customer_service, invitation_service, order_service},
    state::AppState,
};

/// Store back-office routes for orders, customers and team invitations.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/customers", get(list_customers))
        .route("/customers/{id}", get(get_customer))
        .route("/invitations", get(list_invitations).post(create_invitation))
        .route("/invitations/{id}", delete(revoke_invitation))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("financial_status" = Option<String>, Query, description = "pending, paid, refunded or cancelled"),
        ("fulfillment_status" = Option<String>, Query, description = "unfulfilled, partial or fulfilled"),
        ("customer_id" = Option<Uuid>, Query, description = "Orders of one customer"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders of the store", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, &ctx, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with line items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, &ctx, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 400, description = "Illegal transition"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_order_status(&state, &user, &ctx, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/customers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search email and name"),
    ),
    responses(
        (status = 200, description = "Customers of the store", body = ApiResponse<CustomerList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = customer_service::list_customers(&state, &user, &ctx, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer with order count", body = ApiResponse<CustomerDetail>),
        (status = 404, description = "Customer not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CustomerDetail>>> {
    let resp = customer_service::get_customer(&state, &user, &ctx, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/invitations",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Invitations", body = ApiResponse<InvitationList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_invitations(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<InvitationList>>> {
    let resp = invitation_service::list_invitations(&state, &user, &ctx, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/invitations",
    request_body = CreateInvitationRequest,
    responses(
        (status = 200, description = "Invitation created", body = ApiResponse<Invitation>),
        (status = 400, description = "Invalid invitation"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_invitation(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Json(payload): Json<CreateInvitationRequest>,
) -> AppResult<Json<ApiResponse<Invitation>>> {
    payload.validate()?;
    let resp = invitation_service::create_invitation(&state, &user, &ctx, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/invitations/{id}",
    params(("id" = Uuid, Path, description = "Invitation ID")),
    responses(
        (status = 200, description = "Invitation revoked"),
        (status = 404, description = "Invitation not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn revoke_invitation(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = invitation_service::revoke_invitation(&state, &user, &ctx, id).await?;
    Ok(Json(resp))
}
