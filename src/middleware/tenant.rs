use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::resolver::{AccessMethod, Resolution, resolve_host},
    error::{AppError, AppResult},
    models::Tenant,
    services::tenant_service,
    state::AppState,
};

pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const LOCALE_HEADER: &str = "x-locale";
/// Set by the edge for display only; echoed back unchanged.
pub const TENANT_NAME_HEADER: &str = "x-tenant-name";
pub const FORWARDED_HOST_HEADER: &str = "x-forwarded-host";

/// How the current request was tied to its tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TenantAccess {
    Header,
    Subdomain,
    CustomDomain,
    QueryParam,
}

impl From<AccessMethod> for TenantAccess {
    fn from(method: AccessMethod) -> Self {
        match method {
            AccessMethod::Subdomain => TenantAccess::Subdomain,
            AccessMethod::CustomDomain => TenantAccess::CustomDomain,
        }
    }
}

/// Request-scoped tenant, passed explicitly into every tenant-scoped service.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: Tenant,
    pub access: TenantAccess,
    pub locale: String,
}

impl TenantContext {
    pub fn id(&self) -> Uuid {
        self.tenant.id
    }

    pub fn currency(&self) -> &str {
        &self.tenant.settings.currency
    }

    pub fn new(tenant: Tenant, access: TenantAccess) -> Self {
        let locale = tenant.settings.locale.clone();
        Self {
            tenant,
            access,
            locale,
        }
    }
}

/// Host the client asked for, preferring the edge's forwarded value.
pub fn request_host(parts: &Parts) -> Option<String> {
    [FORWARDED_HOST_HEADER, header::HOST.as_str()]
        .iter()
        .find_map(|name| parts.headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or(value).trim().to_string())
        .or_else(|| parts.uri.host().map(str::to_string))
}

async fn load_by_id(state: &AppState, raw: &str) -> AppResult<Tenant> {
    let id = Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::BadRequest("tenant id must be a UUID".into()))?;
    tenant_service::find_active_by_id(&state.orm, id)
        .await?
        .ok_or(AppError::NotFound)
}

impl FromRequestParts<AppState> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let locale_override = parts
            .headers
            .get(LOCALE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let mut context = resolve_context(parts, state).await?;
        if let Some(locale) = locale_override {
            context.locale = locale;
        }

        tracing::Span::current().record("tenant_id", tracing::field::display(context.id()));
        Ok(context)
    }
}

async fn resolve_context(parts: &Parts, state: &AppState) -> AppResult<TenantContext> {
    if let Some(raw) = parts
        .headers
        .get(TENANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        let tenant = load_by_id(state, raw).await?;
        return Ok(TenantContext::new(tenant, TenantAccess::Header));
    }

    if let Some(host) = request_host(parts) {
        let settings = state.config.domain_settings();
        match resolve_host(&state.orm, &host, &settings).await? {
            Resolution::Tenant { tenant, access } => {
                return Ok(TenantContext::new(tenant, access.into()));
            }
            Resolution::NotFound { subdomain } => {
                tracing::debug!(%subdomain, "no active tenant for subdomain");
                return Err(AppError::NotFound);
            }
            Resolution::Platform => {}
        }
    }

    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map_err(|_| AppError::BadRequest("invalid query string".into()))?;
    match params.get("tenant_id") {
        Some(raw) => {
            let tenant = load_by_id(state, raw).await?;
            Ok(TenantContext::new(tenant, TenantAccess::QueryParam))
        }
        // platform context has no tenant-scoped data
        None => Err(AppError::NotFound),
    }
}
