use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit,
    domain::{plans::Plan, slug::validate_subdomain},
    dto::platform::{CreateTenantRequest, PlatformTenantUpdate, TenantList, TenantListQuery},
    entity::tenants::{ActiveModel as TenantActive, Column as TenantCol, Entity as Tenants},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_platform_admin},
    models::{Tenant, TenantSettings},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Any signed-in user may open a store; they become its owner.
pub async fn provision_tenant(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTenantRequest,
) -> AppResult<ApiResponse<Tenant>> {
    let subdomain = payload.subdomain.trim().to_ascii_lowercase();
    validate_subdomain(&subdomain).map_err(AppError::BadRequest)?;

    let taken = Tenants::find()
        .filter(TenantCol::Subdomain.eq(subdomain.clone()))
        .one(&state.orm)
        .await?;
    if taken.is_some() {
        return Err(AppError::BadRequest("subdomain already taken".into()));
    }

    let mut settings = TenantSettings::default();
    if let Some(currency) = payload.currency {
        settings.currency = currency.to_ascii_uppercase();
    }
    if let Some(locale) = payload.locale {
        settings.locale = locale;
    }

    let now = Utc::now();
    let tenant = TenantActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        subdomain: Set(subdomain),
        domain: Set(None),
        is_active: Set(true),
        plan: Set(Plan::Starter.as_str().to_string()),
        owner_id: Set(Some(user.user_id)),
        gateway_customer_id: Set(None),
        settings: Set(settings.to_value()),
        theme: Set(serde_json::json!({})),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(tenant_id = %tenant.id, subdomain = %tenant.subdomain, "tenant provisioned");
    audit::record(
        &state.pool,
        Some(tenant.id),
        Some(user.user_id),
        "tenant_provision",
        "tenants",
        serde_json::json!({ "subdomain": tenant.subdomain }),
    )
    .await;

    Ok(ApiResponse::success(
        "Tenant created",
        Tenant::from(tenant),
        Some(Meta::empty()),
    ))
}

pub async fn list_tenants(
    state: &AppState,
    user: &AuthUser,
    query: TenantListQuery,
) -> AppResult<ApiResponse<TenantList>> {
    ensure_platform_admin(user, &state.config)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(TenantCol::Name).ilike(pattern.clone()))
                .add(Expr::col(TenantCol::Subdomain).ilike(pattern)),
        );
    }
    if let Some(active) = query.active {
        condition = condition.add(TenantCol::IsActive.eq(active));
    }

    let finder = Tenants::find()
        .filter(condition)
        .order_by_desc(TenantCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Tenant::from)
        .collect();

    Ok(ApiResponse::success(
        "Tenants",
        TenantList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn update_tenant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: PlatformTenantUpdate,
) -> AppResult<ApiResponse<Tenant>> {
    ensure_platform_admin(user, &state.config)?;

    let existing = Tenants::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(t) => t,
        None => return Err(AppError::NotFound),
    };

    let mut active: TenantActive = existing.into();
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(plan) = payload.plan {
        active.plan = Set(plan.as_str().to_string());
    }
    active.updated_at = Set(Utc::now().into());
    let tenant = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(tenant.id),
        Some(user.user_id),
        "platform_tenant_update",
        "tenants",
        serde_json::json!({ "is_active": tenant.is_active, "plan": tenant.plan }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Tenant::from(tenant),
        Some(Meta::empty()),
    ))
}
