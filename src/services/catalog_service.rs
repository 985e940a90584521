use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        inventory::{
            ProductType, StockRules, StockStatus, Variant, decode_legacy_variants, summarize,
        },
        slug::slugify,
    },
    dto::products::{
        CreateProductRequest, LowStockQuery, ProductList, ReplaceVariantsRequest,
        UpdateProductRequest,
    },
    entity::{
        brands::{Column as BrandCol, Entity as Brands},
        categories::{Column as CategoryCol, Entity as Categories},
        product_variants::{
            ActiveModel as VariantActive, Column as VariantCol, Entity as ProductVariants,
            Model as VariantModel,
        },
        products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ensure_tenant_admin, ensure_tenant_staff},
        tenant::TenantContext,
    },
    models::{Product, ProductVariant},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// Public catalogue listing; inactive products are never shown.
pub async fn list_products(
    state: &AppState,
    ctx: &TenantContext,
    mut query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    query.active = Some(true);
    query_products(state, ctx, query).await
}

pub async fn list_products_admin(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_tenant_staff(user, &ctx.tenant)?;
    query_products(state, ctx, query).await
}

async fn query_products(
    state: &AppState,
    ctx: &TenantContext,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(ProductCol::TenantId.eq(ctx.id()));

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ProductCol::Title).ilike(pattern.clone()))
                .add(Expr::col(ProductCol::Description).ilike(pattern.clone()))
                .add(Expr::col(ProductCol::Sku).ilike(pattern)),
        );
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(ProductCol::CategoryId.eq(category_id));
    }
    if let Some(brand_id) = query.brand_id {
        condition = condition.add(ProductCol::BrandId.eq(brand_id));
    }
    if let Some(featured) = query.featured {
        condition = condition.add(ProductCol::IsFeatured.eq(featured));
    }
    if let Some(active) = query.active {
        condition = condition.add(ProductCol::IsActive.eq(active));
    }

    let sort_col = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => ProductCol::CreatedAt,
        ProductSortBy::Price => ProductCol::Price,
        ProductSortBy::Title => ProductCol::Title,
    };
    let mut finder = Products::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = assemble(state, ctx, models).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

/// Looks a product up by id, or by slug when the key is not a UUID.
pub async fn get_product(
    state: &AppState,
    ctx: &TenantContext,
    key: &str,
) -> AppResult<ApiResponse<Product>> {
    let key_condition = match Uuid::parse_str(key) {
        Ok(id) => ProductCol::Id.eq(id),
        Err(_) => ProductCol::Slug.eq(key.to_string()),
    };
    let result = Products::find()
        .filter(ProductCol::TenantId.eq(ctx.id()))
        .filter(ProductCol::IsActive.eq(true))
        .filter(key_condition)
        .one(&state.orm)
        .await?;
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    let product = assemble_one(state, ctx, result).await?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    ensure_non_negative("price", payload.price)?;
    if let Some(compare) = payload.compare_price {
        ensure_non_negative("compare_price", compare)?;
    }

    tokio::try_join!(
        ensure_category(state, ctx, payload.category_id),
        ensure_brand(state, ctx, payload.brand_id),
    )?;

    let slug = pick_slug(payload.slug.as_deref(), &payload.title)?;
    ensure_slug_free(state, ctx, &slug, None).await?;

    let variants = decode_legacy_variants(payload.variants);
    let product_type = payload.product_type.unwrap_or(if variants.is_empty() {
        ProductType::Single
    } else {
        ProductType::Variable
    });

    let now = Utc::now();
    let product_id = Uuid::new_v4();
    let txn = state.orm.begin().await?;

    let product = ProductActive {
        id: Set(product_id),
        tenant_id: Set(ctx.id()),
        category_id: Set(payload.category_id),
        brand_id: Set(payload.brand_id),
        title: Set(payload.title.trim().to_string()),
        slug: Set(slug),
        description: Set(payload.description),
        product_type: Set(product_type.as_str().to_string()),
        price: Set(payload.price),
        compare_price: Set(payload.compare_price),
        sku: Set(payload.sku),
        inventory_quantity: Set(payload.inventory_quantity.max(0)),
        track_inventory: Set(payload.track_inventory),
        is_active: Set(payload.is_active),
        is_featured: Set(payload.is_featured),
        variants: Set(None),
        images: Set(serde_json::json!(payload.images)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    insert_variants(&txn, ctx.id(), product_id, &variants).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id, "variants": variants.len() }),
    )
    .await;

    let product = assemble_one(state, ctx, product).await?;
    Ok(ApiResponse::success("Product created", product, Some(Meta::empty())))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let existing = find_owned(state, ctx, id).await?;

    tokio::try_join!(
        ensure_category(state, ctx, payload.category_id),
        ensure_brand(state, ctx, payload.brand_id),
    )?;

    let mut active: ProductActive = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(slug) = payload.slug {
        let slug = pick_slug(Some(&slug), "")?;
        ensure_slug_free(state, ctx, &slug, Some(id)).await?;
        active.slug = Set(slug);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(product_type) = payload.product_type {
        active.product_type = Set(product_type.as_str().to_string());
    }
    if let Some(price) = payload.price {
        ensure_non_negative("price", price)?;
        active.price = Set(price);
    }
    if let Some(compare) = payload.compare_price {
        ensure_non_negative("compare_price", compare)?;
        active.compare_price = Set(Some(compare));
    }
    if let Some(sku) = payload.sku {
        active.sku = Set(Some(sku));
    }
    if let Some(quantity) = payload.inventory_quantity {
        active.inventory_quantity = Set(quantity.max(0));
    }
    if let Some(track) = payload.track_inventory {
        active.track_inventory = Set(track);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(featured) = payload.is_featured {
        active.is_featured = Set(featured);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(Some(category_id));
    }
    if let Some(brand_id) = payload.brand_id {
        active.brand_id = Set(Some(brand_id));
    }
    if let Some(images) = payload.images {
        active.images = Set(serde_json::json!(images));
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let product = assemble_one(state, ctx, product).await?;
    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

/// Swaps the product's variant rows for a freshly decoded set.
pub async fn replace_variants(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
    payload: ReplaceVariantsRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let existing = find_owned(state, ctx, id).await?;
    let variants = decode_legacy_variants(Some(payload.variants));

    let txn = state.orm.begin().await?;
    ProductVariants::delete_many()
        .filter(VariantCol::ProductId.eq(id))
        .filter(VariantCol::TenantId.eq(ctx.id()))
        .exec(&txn)
        .await?;
    insert_variants(&txn, ctx.id(), id, &variants).await?;

    // legacy inline copy is retired once rows exist
    let mut active: ProductActive = existing.into();
    active.variants = Set(None);
    if !variants.is_empty() {
        active.product_type = Set(ProductType::Variable.as_str().to_string());
    }
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "product_variants_replace",
        "product_variants",
        serde_json::json!({ "product_id": id, "variants": variants.len() }),
    )
    .await;

    let product = assemble_one(state, ctx, product).await?;
    Ok(ApiResponse::success("Variants replaced", product, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_tenant_admin(user, &ctx.tenant)?;
    let result = Products::delete_many()
        .filter(ProductCol::Id.eq(id))
        .filter(ProductCol::TenantId.eq(ctx.id()))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Products whose rolled-up stock is low or out, against the tenant threshold.
pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_tenant_staff(user, &ctx.tenant)?;
    let (page, limit, offset) = Pagination::new(query.page, query.per_page).normalize();
    let threshold = query
        .threshold
        .unwrap_or_else(|| ctx.tenant.low_stock_threshold(state.config.default_low_stock_threshold));

    // only the columns the stock rollup reads; full rows are loaded for one page
    let candidates: Vec<(Uuid, String, Decimal, i64, Option<serde_json::Value>)> = Products::find()
        .select_only()
        .columns([
            ProductCol::Id,
            ProductCol::ProductType,
            ProductCol::Price,
            ProductCol::InventoryQuantity,
            ProductCol::Variants,
        ])
        .filter(ProductCol::TenantId.eq(ctx.id()))
        .filter(ProductCol::IsActive.eq(true))
        .filter(ProductCol::TrackInventory.eq(true))
        .filter(ProductCol::ProductType.ne(ProductType::Digital.as_str()))
        .order_by_asc(ProductCol::Title)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let rules = StockRules {
        low_stock_threshold: threshold,
        currency: ctx.currency(),
    };
    let flagged = flag_low_stock(state, candidates, &rules).await?;

    let total = flagged.len() as i64;
    let page_ids: Vec<Uuid> = flagged
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    let models = if page_ids.is_empty() {
        Vec::new()
    } else {
        Products::find()
            .filter(ProductCol::TenantId.eq(ctx.id()))
            .filter(ProductCol::Id.is_in(page_ids))
            .order_by_asc(ProductCol::Title)
            .all(&state.orm)
            .await?
    };
    let items = assemble_with(state, models, &rules).await?;

    Ok(ApiResponse::success(
        "Low stock",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

async fn find_owned(state: &AppState, ctx: &TenantContext, id: Uuid) -> AppResult<ProductModel> {
    let existing = Products::find_by_id(id)
        .filter(ProductCol::TenantId.eq(ctx.id()))
        .one(&state.orm)
        .await?;
    match existing {
        Some(p) => Ok(p),
        None => Err(AppError::NotFound),
    }
}

fn stock_rules<'a>(state: &AppState, ctx: &'a TenantContext) -> StockRules<'a> {
    StockRules {
        low_stock_threshold: ctx
            .tenant
            .low_stock_threshold(state.config.default_low_stock_threshold),
        currency: ctx.currency(),
    }
}

async fn assemble_one(
    state: &AppState,
    ctx: &TenantContext,
    model: ProductModel,
) -> AppResult<Product> {
    let mut items = assemble(state, ctx, vec![model]).await?;
    items.pop().ok_or(AppError::NotFound)
}

async fn assemble(
    state: &AppState,
    ctx: &TenantContext,
    models: Vec<ProductModel>,
) -> AppResult<Vec<Product>> {
    let rules = stock_rules(state, ctx);
    assemble_with(state, models, &rules).await
}

/// Loads variant rows for a page of products and attaches stock summaries.
/// Ids of the candidates whose rollup is low or out, in input order.
async fn flag_low_stock(
    state: &AppState,
    candidates: Vec<(Uuid, String, Decimal, i64, Option<serde_json::Value>)>,
    rules: &StockRules<'_>,
) -> AppResult<Vec<Uuid>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = candidates.iter().map(|c| c.0).collect();
    let rows: Vec<(Uuid, Decimal, i64, bool)> = ProductVariants::find()
        .select_only()
        .columns([
            VariantCol::ProductId,
            VariantCol::Price,
            VariantCol::InventoryQuantity,
            VariantCol::IsActive,
        ])
        .filter(VariantCol::ProductId.is_in(ids))
        .into_tuple()
        .all(&state.orm)
        .await?;

    let mut by_product: HashMap<Uuid, Vec<Variant>> = HashMap::new();
    for (product_id, price, inventory_quantity, is_active) in rows {
        by_product.entry(product_id).or_default().push(Variant {
            id: None,
            title: None,
            sku: None,
            price,
            compare_price: None,
            inventory_quantity,
            is_active,
        });
    }

    Ok(candidates
        .into_iter()
        .filter_map(|(id, product_type, price, quantity, legacy)| {
            let product_type = product_type.parse().unwrap_or(ProductType::Single);
            let variants = match by_product.remove(&id) {
                Some(rows) => rows,
                None => decode_legacy_variants(legacy),
            };
            let stock = summarize(product_type, price, quantity, &variants, rules);
            matches!(stock.status, StockStatus::Low | StockStatus::Out).then_some(id)
        })
        .collect())
}

async fn assemble_with(
    state: &AppState,
    models: Vec<ProductModel>,
    rules: &StockRules<'_>,
) -> AppResult<Vec<Product>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let rows = ProductVariants::find()
        .filter(VariantCol::ProductId.is_in(ids))
        .order_by_asc(VariantCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let mut by_product: HashMap<Uuid, Vec<ProductVariant>> = HashMap::new();
    for row in rows {
        by_product
            .entry(row.product_id)
            .or_default()
            .push(ProductVariant::from(row));
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let variants = by_product.remove(&model.id).unwrap_or_default();
            product_from_entity(model, variants, rules)
        })
        .collect())
}

pub(crate) fn product_from_entity(
    model: ProductModel,
    variants: Vec<ProductVariant>,
    rules: &StockRules<'_>,
) -> Product {
    let product_type = model.product_type.parse().unwrap_or(ProductType::Single);
    // rows win; the inline column is only read for products never migrated
    let canonical: Vec<Variant> = if variants.is_empty() {
        decode_legacy_variants(model.variants.clone())
    } else {
        variants.iter().map(Variant::from).collect()
    };
    let stock = summarize(
        product_type,
        model.price,
        model.inventory_quantity,
        &canonical,
        rules,
    );

    Product {
        id: model.id,
        tenant_id: model.tenant_id,
        category_id: model.category_id,
        brand_id: model.brand_id,
        title: model.title,
        slug: model.slug,
        description: model.description,
        product_type,
        price: model.price,
        compare_price: model.compare_price,
        sku: model.sku,
        inventory_quantity: model.inventory_quantity,
        track_inventory: model.track_inventory,
        is_active: model.is_active,
        is_featured: model.is_featured,
        images: model.images,
        variants,
        stock,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

async fn insert_variants<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
    variants: &[Variant],
) -> AppResult<Vec<VariantModel>> {
    let now = Utc::now();
    let mut saved = Vec::with_capacity(variants.len());
    for (index, variant) in variants.iter().enumerate() {
        ensure_non_negative("variant price", variant.price)?;
        let title = variant
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Variant {}", index + 1));
        let row = VariantActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            tenant_id: Set(tenant_id),
            title: Set(title),
            sku: Set(variant.sku.clone()),
            price: Set(variant.price),
            compare_price: Set(variant.compare_price),
            inventory_quantity: Set(variant.inventory_quantity.max(0)),
            is_active: Set(variant.is_active),
            options: Set(serde_json::json!({})),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(conn)
        .await?;
        saved.push(row);
    }
    Ok(saved)
}

fn ensure_non_negative(field: &str, amount: Decimal) -> AppResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::BadRequest(format!("{field} cannot be negative")));
    }
    Ok(())
}

fn pick_slug(explicit: Option<&str>, title: &str) -> AppResult<String> {
    let slug = slugify(explicit.unwrap_or(title));
    if slug.is_empty() {
        return Err(AppError::BadRequest("slug cannot be empty".into()));
    }
    Ok(slug)
}

async fn ensure_slug_free(
    state: &AppState,
    ctx: &TenantContext,
    slug: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Products::find()
        .filter(ProductCol::TenantId.eq(ctx.id()))
        .filter(ProductCol::Slug.eq(slug.to_string()));
    if let Some(id) = except {
        finder = finder.filter(ProductCol::Id.ne(id));
    }
    if finder.one(&state.orm).await?.is_some() {
        return Err(AppError::BadRequest("slug already exists".into()));
    }
    Ok(())
}

async fn ensure_category(state: &AppState, ctx: &TenantContext, id: Option<Uuid>) -> AppResult<()> {
    let Some(id) = id else { return Ok(()) };
    let found = Categories::find_by_id(id)
        .filter(CategoryCol::TenantId.eq(ctx.id()))
        .one(&state.orm)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest("unknown category".into())),
    }
}

async fn ensure_brand(state: &AppState, ctx: &TenantContext, id: Option<Uuid>) -> AppResult<()> {
    let Some(id) = id else { return Ok(()) };
    let found = Brands::find_by_id(id)
        .filter(BrandCol::TenantId.eq(ctx.id()))
        .one(&state.orm)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest("unknown brand".into())),
    }
}
