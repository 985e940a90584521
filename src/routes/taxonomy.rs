use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::taxonomy::{BrandList, CategoryList, CreateTaxonRequest, UpdateTaxonRequest},
    error::AppResult,
    middleware::{
        auth::{AuthUser, ensure_tenant_staff},
        tenant::TenantContext,
    },
    models::{Brand, Category},
    response::ApiResponse,
    services::taxonomy_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/brands", get(list_brands))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories_admin).post(create_category))
        .route("/categories/{id}", patch(update_category).delete(delete_category))
        .route("/brands", get(list_brands_admin).post(create_brand))
        .route("/brands/{id}", patch(update_brand).delete(delete_brand))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Active categories", body = ApiResponse<CategoryList>),
        (status = 404, description = "Unknown store"),
    ),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = taxonomy_service::list_categories(&state, &ctx, true).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/brands",
    responses(
        (status = 200, description = "Active brands", body = ApiResponse<BrandList>),
        (status = 404, description = "Unknown store"),
    ),
    tag = "Catalog"
)]
pub async fn list_brands(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> AppResult<Json<ApiResponse<BrandList>>> {
    let resp = taxonomy_service::list_brands(&state, &ctx, true).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/categories",
    responses(
        (status = 200, description = "All categories", body = ApiResponse<CategoryList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_categories_admin(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    ensure_tenant_staff(&user, &ctx.tenant)?;
    let resp = taxonomy_service::list_categories(&state, &ctx, false).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateTaxonRequest,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<Category>),
        (status = 400, description = "Invalid category"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Json(payload): Json<CreateTaxonRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    payload.validate()?;
    let resp = taxonomy_service::create_category(&state, &user, &ctx, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateTaxonRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaxonRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    payload.validate()?;
    let resp = taxonomy_service::update_category(&state, &user, &ctx, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = taxonomy_service::delete_category(&state, &user, &ctx, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/brands",
    responses(
        (status = 200, description = "All brands", body = ApiResponse<BrandList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_brands_admin(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<BrandList>>> {
    ensure_tenant_staff(&user, &ctx.tenant)?;
    let resp = taxonomy_service::list_brands(&state, &ctx, false).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/brands",
    request_body = CreateTaxonRequest,
    responses(
        (status = 200, description = "Brand created", body = ApiResponse<Brand>),
        (status = 400, description = "Invalid brand"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_brand(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Json(payload): Json<CreateTaxonRequest>,
) -> AppResult<Json<ApiResponse<Brand>>> {
    payload.validate()?;
    let resp = taxonomy_service::create_brand(&state, &user, &ctx, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/brands/{id}",
    params(("id" = Uuid, Path, description = "Brand ID")),
    request_body = UpdateTaxonRequest,
    responses(
        (status = 200, description = "Brand updated", body = ApiResponse<Brand>),
        (status = 404, description = "Brand not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_brand(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaxonRequest>,
) -> AppResult<Json<ApiResponse<Brand>>> {
    payload.validate()?;
    let resp = taxonomy_service::update_brand(&state, &user, &ctx, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/brands/{id}",
    params(("id" = Uuid, Path, description = "Brand ID")),
    responses(
        (status = 200, description = "Brand deleted"),
        (status = 404, description = "Brand not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_brand(
    State(state): State<AppState>,
    ctx: TenantContext,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = taxonomy_service::delete_brand(&state, &user, &ctx, id).await?;
    Ok(Json(resp))
}
