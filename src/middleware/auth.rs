use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, error::AppError, models::Tenant};

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

/// Claims in tokens minted by the auth provider.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: String,
    pub tenant_id: Option<Uuid>,
}

/// Owner of the tenant, or an admin-level member of it.
pub fn ensure_tenant_admin(user: &AuthUser, tenant: &Tenant) -> Result<(), AppError> {
    if tenant.owner_id == Some(user.user_id) {
        return Ok(());
    }
    let member = user.tenant_id == Some(tenant.id);
    if member && (user.role == ROLE_OWNER || user.role == ROLE_ADMIN) {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

/// Any admin-console member of the tenant, staff included.
pub fn ensure_tenant_staff(user: &AuthUser, tenant: &Tenant) -> Result<(), AppError> {
    if user.tenant_id == Some(tenant.id) && user.role == ROLE_STAFF {
        return Ok(());
    }
    ensure_tenant_admin(user, tenant)
}

pub fn ensure_platform_admin(user: &AuthUser, config: &AppConfig) -> Result<(), AppError> {
    match user.email.as_deref() {
        Some(email) if config.is_platform_admin(email) => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let auth_str = auth_header.to_str().map_err(|_| AppError::Unauthorized)?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?
        .trim();
    Ok(Some(token))
}

fn decode_user(token: &str) -> Result<AuthUser, AppError> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id,
        email: decoded.claims.email.map(|e| e.to_ascii_lowercase()),
        role: decoded.claims.role,
        tenant_id: decoded.claims.tenant_id,
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AppError::Unauthorized)?;
        decode_user(token)
    }
}

/// Signed-in shopper if a token is present; guests pass through.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => decode_user(token).map(|user| MaybeAuthUser(Some(user))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TenantSettings;
    use chrono::Utc;

    fn tenant(owner: Option<Uuid>) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            subdomain: "acme".into(),
            domain: None,
            is_active: true,
            plan: Default::default(),
            owner_id: owner,
            gateway_customer_id: None,
            settings: TenantSettings::default(),
            theme: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user(role: &str, tenant_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: None,
            role: role.into(),
            tenant_id,
        }
    }

    #[test]
    fn owner_is_admin_without_membership_claim() {
        let owner = user("customer", None);
        let t = tenant(Some(owner.user_id));
        assert!(ensure_tenant_admin(&owner, &t).is_ok());
    }

    #[test]
    fn roles_are_scoped_to_their_tenant() {
        let t = tenant(None);
        assert!(ensure_tenant_admin(&user(ROLE_ADMIN, Some(t.id)), &t).is_ok());
        assert!(ensure_tenant_admin(&user(ROLE_ADMIN, Some(Uuid::new_v4())), &t).is_err());
        assert!(ensure_tenant_admin(&user(ROLE_STAFF, Some(t.id)), &t).is_err());
        assert!(ensure_tenant_staff(&user(ROLE_STAFF, Some(t.id)), &t).is_ok());
        assert!(ensure_tenant_staff(&user("customer", Some(t.id)), &t).is_err());
    }
}
