use std::future::Future;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    domain::{
        resolver::{Resolution, TenantDirectory, classify_host, resolve_host},
        slug::validate_custom_domain,
        storage::{UploadCategory, object_path, public_url},
    },
    dto::tenants::{
        PaymentSettingsView, ResolveView, UpdatePaymentSettingsRequest, UpdateTenantRequest,
        UploadRequest, UploadTicket,
    },
    entity::{
        payment_settings::{ActiveModel as PaymentActive, Entity as PaymentSettings},
        tenants::{ActiveModel as TenantActive, Column as TenantCol, Entity as Tenants},
    },
    error::{AppError, AppResult},
    middleware::{
        auth::{AuthUser, ensure_tenant_admin, ensure_tenant_staff},
        tenant::TenantContext,
    },
    models::{Storefront, Tenant},
    response::{ApiResponse, Meta},
    state::AppState,
};

impl TenantDirectory for DatabaseConnection {
    fn find_active_by_domain(
        &self,
        domain: &str,
    ) -> impl Future<Output = AppResult<Option<Tenant>>> + Send {
        let domain = domain.to_string();
        async move {
            let found = Tenants::find()
                .filter(TenantCol::Domain.eq(domain))
                .filter(TenantCol::IsActive.eq(true))
                .one(self)
                .await?;
            Ok(found.map(Tenant::from))
        }
    }

    fn find_active_by_subdomain(
        &self,
        subdomain: &str,
    ) -> impl Future<Output = AppResult<Option<Tenant>>> + Send {
        let subdomain = subdomain.to_string();
        async move {
            let found = Tenants::find()
                .filter(TenantCol::Subdomain.eq(subdomain))
                .filter(TenantCol::IsActive.eq(true))
                .one(self)
                .await?;
            Ok(found.map(Tenant::from))
        }
    }
}

pub async fn find_active_by_id(orm: &OrmConn, id: Uuid) -> AppResult<Option<Tenant>> {
    let found = Tenants::find_by_id(id)
        .filter(TenantCol::IsActive.eq(true))
        .one(orm)
        .await?;
    Ok(found.map(Tenant::from))
}

pub fn storefront(ctx: &TenantContext) -> ApiResponse<Storefront> {
    let mut view = Storefront::from(&ctx.tenant);
    view.locale = ctx.locale.clone();
    ApiResponse::success("Tenant", view, Some(Meta::empty()))
}

pub async fn resolve(state: &AppState, host: &str) -> AppResult<ApiResponse<ResolveView>> {
    let settings = state.config.domain_settings();
    let class = classify_host(host, &settings);
    tracing::debug!(host, ?class, "resolving host");

    let view = match resolve_host(&state.orm, host, &settings).await? {
        Resolution::Platform => ResolveView::platform(),
        Resolution::Tenant { tenant, access } => ResolveView::tenant(&tenant, access),
        Resolution::NotFound { subdomain } => ResolveView::not_found(subdomain),
    };
    Ok(ApiResponse::success("Resolved", view, Some(Meta::empty())))
}

pub async fn update_tenant(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    payload: UpdateTenantRequest,
) -> AppResult<ApiResponse<Tenant>> {
    ensure_tenant_admin(user, &ctx.tenant)?;

    let existing = Tenants::find_by_id(ctx.id()).one(&state.orm).await?;
    let existing = match existing {
        Some(t) => t,
        None => return Err(AppError::NotFound),
    };

    let mut settings = ctx.tenant.settings.clone();
    let mut active: TenantActive = existing.into();

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name cannot be empty".into()));
        }
        active.name = Set(name);
    }

    if let Some(domain) = payload.domain {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        if domain.is_empty() {
            active.domain = Set(None);
        } else {
            validate_custom_domain(&domain, &state.config.platform_domain)
                .map_err(AppError::BadRequest)?;
            let taken = Tenants::find()
                .filter(TenantCol::Domain.eq(domain.clone()))
                .filter(TenantCol::Id.ne(ctx.id()))
                .one(&state.orm)
                .await?;
            if taken.is_some() {
                return Err(AppError::BadRequest("domain already in use".into()));
            }
            active.domain = Set(Some(domain));
        }
    }

    if let Some(currency) = payload.currency {
        let currency = currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::BadRequest("currency must be an ISO 4217 code".into()));
        }
        settings.currency = currency;
    }
    if let Some(locale) = payload.locale {
        settings.locale = locale;
    }
    if let Some(threshold) = payload.low_stock_threshold {
        settings.low_stock_threshold = Some(threshold);
    }
    if let Some(methods) = payload.shipping_methods {
        settings.shipping_methods = methods;
    }
    active.settings = Set(settings.to_value());

    if let Some(theme) = payload.theme {
        active.theme = Set(theme);
    }
    active.updated_at = Set(Utc::now().into());

    let tenant = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(tenant.id),
        Some(user.user_id),
        "tenant_update",
        "tenants",
        serde_json::json!({ "tenant_id": tenant.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Tenant::from(tenant),
        Some(Meta::empty()),
    ))
}

pub async fn get_payment_settings(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
) -> AppResult<ApiResponse<PaymentSettingsView>> {
    ensure_tenant_admin(user, &ctx.tenant)?;

    let view = PaymentSettings::find_by_id(ctx.id())
        .one(&state.orm)
        .await?
        .map(PaymentSettingsView::from)
        .unwrap_or_else(PaymentSettingsView::unconfigured);

    Ok(ApiResponse::success("Payment settings", view, Some(Meta::empty())))
}

pub async fn put_payment_settings(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    payload: UpdatePaymentSettingsRequest,
) -> AppResult<ApiResponse<PaymentSettingsView>> {
    ensure_tenant_admin(user, &ctx.tenant)?;

    let existing = PaymentSettings::find_by_id(ctx.id()).one(&state.orm).await?;
    let saved = match existing {
        Some(row) => {
            let mut active: PaymentActive = row.into();
            active.provider = Set(payload.provider);
            active.enabled = Set(payload.enabled);
            active.public_key = Set(payload.public_key);
            // an omitted secret keeps the stored one
            if let Some(secret) = payload.secret_key.filter(|s| !s.is_empty()) {
                active.secret_key = Set(Some(secret));
            }
            active.test_mode = Set(payload.test_mode);
            active.updated_at = Set(Utc::now().into());
            active.update(&state.orm).await?
        }
        None => {
            PaymentActive {
                tenant_id: Set(ctx.id()),
                provider: Set(payload.provider),
                enabled: Set(payload.enabled),
                public_key: Set(payload.public_key),
                secret_key: Set(payload.secret_key.filter(|s| !s.is_empty())),
                test_mode: Set(payload.test_mode),
                updated_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?
        }
    };

    audit::record(
        &state.pool,
        Some(ctx.id()),
        Some(user.user_id),
        "payment_settings_update",
        "payment_settings",
        serde_json::json!({ "provider": saved.provider, "enabled": saved.enabled }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        PaymentSettingsView::from(saved),
        Some(Meta::empty()),
    ))
}

/// Storage path and public URL for an image the client is about to upload.
pub fn prepare_upload(
    state: &AppState,
    user: &AuthUser,
    ctx: &TenantContext,
    payload: UploadRequest,
) -> AppResult<ApiResponse<UploadTicket>> {
    ensure_tenant_staff(user, &ctx.tenant)?;

    let category: UploadCategory = payload.category.parse().map_err(AppError::BadRequest)?;
    let path = object_path(ctx.id(), category, &payload.filename, Utc::now())
        .map_err(AppError::BadRequest)?;
    let url = public_url(
        &state.config.storage_public_url,
        &state.config.storage_bucket,
        &path,
    );

    Ok(ApiResponse::success(
        "Upload prepared",
        UploadTicket {
            bucket: state.config.storage_bucket.clone(),
            path,
            public_url: url,
        },
        Some(Meta::empty()),
    ))
}
