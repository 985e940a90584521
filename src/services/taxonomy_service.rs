//! Categories and brands. Both are flat, tenant-owned lists with a slug.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    domain::slug::slugify,
    dto::taxonomy::{BrandList, CategoryList, CreateTaxonRequest, UpdateTaxonRequest},
    entity::{
        brands::{ActiveModel as BrandActive, Column as BrandCol, Entity as Brands},
        categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
    },
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ensure_tenant_admin},
        tenant::TenantContext,
    },
    models::{Brand, Category},
    response::{ApiResponse, Meta},
    state::AppState,
};

fn taxon_slug(explicit: Option<&str>, name: &str) -> AppResult<String> {
    let slug = slugify(explicit.unwrap_or(name));
    if slug.is_empty() {
        return Err(AppError::BadRequest("slug cannot be empty".into()));
    }
    Ok(slug)
}

pub async fn list_categories(
    state: &AppState,
    ctx: &TenantContext,
    active_only: bool,
) -> AppResult<ApiResponse<CategoryList>> {
    let mut finder = Categories::find().filter(CategoryCol::TenantId.eq(ctx.id()));
    if active_only {
        finder = finder.filter(CategoryCol::IsActive.eq(true));
    }
    let items: Vec<Category> = finder
        .order_by_asc(CategoryCol::SortOrder)
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    payload: CreateTaxonRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let slug = taxon_slug(payload.slug.as_deref(), &payload.name)?;
    let clash = Categories::find()
        .filter(CategoryCol::TenantId.eq(ctx.id()))
        .filter(CategoryCol::Slug.eq(slug.clone()))
        .one(&state.orm)
        .await?;
    if clash.is_some() {
        return Err(AppError::BadRequest("slug already exists".into()));
    }

    let now = Utc::now();
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(ctx.id()),
        name: Set(payload.name.trim().to_string()),
        slug: Set(slug),
        description: Set(payload.description),
        sort_order: Set(payload.sort_order),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        Category::from(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
    payload: UpdateTaxonRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let existing = Categories::find_by_id(id)
        .filter(CategoryCol::TenantId.eq(ctx.id()))
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let mut active: CategoryActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(slug) = payload.slug {
        let slug = taxon_slug(Some(&slug), "")?;
        let clash = Categories::find()
            .filter(CategoryCol::TenantId.eq(ctx.id()))
            .filter(CategoryCol::Slug.eq(slug.clone()))
            .filter(CategoryCol::Id.ne(id))
            .one(&state.orm)
            .await?;
        if clash.is_some() {
            return Err(AppError::BadRequest("slug already exists".into()));
        }
        active.slug = Set(slug);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(sort_order) = payload.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let category = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        Category::from(category),
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let result = Categories::delete_many()
        .filter(CategoryCol::Id.eq(id))
        .filter(CategoryCol::TenantId.eq(ctx.id()))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_brands(
    state: &AppState,
    ctx: &TenantContext,
    active_only: bool,
) -> AppResult<ApiResponse<BrandList>> {
    let mut finder = Brands::find().filter(BrandCol::TenantId.eq(ctx.id()));
    if active_only {
        finder = finder.filter(BrandCol::IsActive.eq(true));
    }
    let items: Vec<Brand> = finder
        .order_by_asc(BrandCol::SortOrder)
        .order_by_asc(BrandCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Brand::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Brands",
        BrandList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_brand(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    payload: CreateTaxonRequest,
) -> AppResult<ApiResponse<Brand>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let slug = taxon_slug(payload.slug.as_deref(), &payload.name)?;
    let clash = Brands::find()
        .filter(BrandCol::TenantId.eq(ctx.id()))
        .filter(BrandCol::Slug.eq(slug.clone()))
        .one(&state.orm)
        .await?;
    if clash.is_some() {
        return Err(AppError::BadRequest("slug already exists".into()));
    }

    let now = Utc::now();
    let brand = BrandActive {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(ctx.id()),
        name: Set(payload.name.trim().to_string()),
        slug: Set(slug),
        description: Set(payload.description),
        sort_order: Set(payload.sort_order),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "brand_create",
        "brands",
        serde_json::json!({ "brand_id": brand.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Brand created",
        Brand::from(brand),
        Some(Meta::empty()),
    ))
}

pub async fn update_brand(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
    payload: UpdateTaxonRequest,
) -> AppResult<ApiResponse<Brand>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let existing = Brands::find_by_id(id)
        .filter(BrandCol::TenantId.eq(ctx.id()))
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    let mut active: BrandActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(slug) = payload.slug {
        let slug = taxon_slug(Some(&slug), "")?;
        let clash = Brands::find()
            .filter(BrandCol::TenantId.eq(ctx.id()))
            .filter(BrandCol::Slug.eq(slug.clone()))
            .filter(BrandCol::Id.ne(id))
            .one(&state.orm)
            .await?;
        if clash.is_some() {
            return Err(AppError::BadRequest("slug already exists".into()));
        }
        active.slug = Set(slug);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(sort_order) = payload.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let brand = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        Brand::from(brand),
        Some(Meta::empty()),
    ))
}

pub async fn delete_brand(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let result = Brands::delete_many()
        .filter(BrandCol::Id.eq(id))
        .filter(BrandCol::TenantId.eq(ctx.id()))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "brand_delete",
        "brands",
        serde_json::json!({ "brand_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
