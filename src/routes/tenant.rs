use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, patch, post},
};
use validator::Validate;

use crate::{
    dto::tenants::{
        PaymentSettingsView, ResolveQuery, ResolveView, UpdatePaymentSettingsRequest,
        UpdateTenantRequest, UploadRequest, UploadTicket,
    },
    error::AppResult,
    middleware::{auth::AuthUser, tenant::TenantContext},
    models::{Storefront, Tenant},
    response::ApiResponse,
    services::tenant_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tenant", get(current_tenant))
        .route("/resolve", get(resolve_host))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/tenant", patch(update_tenant))
        .route(
            "/payment-settings",
            get(get_payment_settings).put(put_payment_settings),
        )
        .route("/uploads", post(prepare_upload))
}

#[utoipa::path(
    get,
    path = "/api/tenant",
    params(
        ("x-tenant-id" = Option<String>, Header, description = "Explicit tenant id"),
        ("x-locale" = Option<String>, Header, description = "Locale override"),
    ),
    responses(
        (status = 200, description = "Public storefront settings", body = ApiResponse<Storefront>),
        (status = 404, description = "Unknown store"),
    ),
    tag = "Tenant"
)]
pub async fn current_tenant(ctx: TenantContext) -> Json<ApiResponse<Storefront>> {
    Json(tenant_service::storefront(&ctx))
}

#[utoipa::path(
    get,
    path = "/api/resolve",
    params(("host" = String, Query, description = "Host name to classify")),
    responses(
        (status = 200, description = "Resolution of the host", body = ApiResponse<ResolveView>),
    ),
    tag = "Tenant"
)]
pub async fn resolve_host(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> AppResult<Json<ApiResponse<ResolveView>>> {
    let resp = tenant_service::resolve(&state, &query.host).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/tenant",
    request_body = UpdateTenantRequest,
    responses(
        (status = 200, description = "Store settings updated", body = ApiResponse<Tenant>),
        (status = 400, description = "Invalid settings"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_tenant(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Json(payload): Json<UpdateTenantRequest>,
) -> AppResult<Json<ApiResponse<Tenant>>> {
    payload.validate()?;
    let resp = tenant_service::update_tenant(&state, &user, &ctx, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/payment-settings",
    responses(
        (status = 200, description = "Payment settings with masked secret", body = ApiResponse<PaymentSettingsView>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_payment_settings(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentSettingsView>>> {
    let resp = tenant_service::get_payment_settings(&state, &user, &ctx).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/payment-settings",
    request_body = UpdatePaymentSettingsRequest,
    responses(
        (status = 200, description = "Payment settings saved", body = ApiResponse<PaymentSettingsView>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn put_payment_settings(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Json(payload): Json<UpdatePaymentSettingsRequest>,
) -> AppResult<Json<ApiResponse<PaymentSettingsView>>> {
    payload.validate()?;
    let resp = tenant_service::put_payment_settings(&state, &user, &ctx, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/uploads",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Object path for the upload", body = ApiResponse<UploadTicket>),
        (status = 400, description = "Unknown upload category"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn prepare_upload(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Json(payload): Json<UploadRequest>,
) -> AppResult<Json<ApiResponse<UploadTicket>>> {
    payload.validate()?;
    let resp = tenant_service::prepare_upload(&state, &user, &ctx, payload)?;
    Ok(Json(resp))
}
