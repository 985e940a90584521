use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::platform::{CreateTenantRequest, PlatformTenantUpdate, TenantList, TenantListQuery},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Tenant,
    response::ApiResponse,
    services::platform_service,
    state::AppState,
};

/// Platform-level tenant management. Not tenant-scoped.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route("/tenants/{id}", patch(update_tenant))
}

#[utoipa::path(
    post,
    path = "/api/platform/tenants",
    request_body = CreateTenantRequest,
    responses(
        (status = 200, description = "Store provisioned", body = ApiResponse<Tenant>),
        (status = 400, description = "Invalid or taken subdomain"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Platform"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTenantRequest>,
) -> AppResult<Json<ApiResponse<Tenant>>> {
    payload.validate()?;
    let resp = platform_service::provision_tenant(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/platform/tenants",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search name and subdomain"),
        ("active" = Option<bool>, Query, description = "Filter by active flag"),
    ),
    responses(
        (status = 200, description = "All stores", body = ApiResponse<TenantList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Platform"
)]
pub async fn list_tenants(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TenantListQuery>,
) -> AppResult<Json<ApiResponse<TenantList>>> {
    let resp = platform_service::list_tenants(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/platform/tenants/{id}",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    request_body = PlatformTenantUpdate,
    responses(
        (status = 200, description = "Store updated", body = ApiResponse<Tenant>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Store not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Platform"
)]
pub async fn update_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PlatformTenantUpdate>,
) -> AppResult<Json<ApiResponse<Tenant>>> {
    let resp = platform_service::update_tenant(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
