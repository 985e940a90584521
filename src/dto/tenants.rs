use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    domain::resolver::AccessMethod,
    entity::payment_settings,
    models::{Storefront, Tenant},
};

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    /// Empty string clears the custom domain.
    pub domain: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(length(min = 2, max = 10))]
    pub locale: Option<String>,
    #[validate(range(min = 0))]
    pub low_stock_threshold: Option<i64>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub shipping_methods: Option<Vec<Value>>,
    #[schema(value_type = Option<Object>)]
    pub theme: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub host: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedContext {
    Platform,
    Tenant,
    NotFound,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveView {
    pub context: ResolvedContext,
    pub tenant: Option<Storefront>,
    pub access_method: Option<AccessMethod>,
    pub subdomain: Option<String>,
}

impl ResolveView {
    pub fn platform() -> Self {
        Self {
            context: ResolvedContext::Platform,
            tenant: None,
            access_method: None,
            subdomain: None,
        }
    }

    pub fn tenant(tenant: &Tenant, access: AccessMethod) -> Self {
        Self {
            context: ResolvedContext::Tenant,
            tenant: Some(Storefront::from(tenant)),
            access_method: Some(access),
            subdomain: Some(tenant.subdomain.clone()),
        }
    }

    pub fn not_found(subdomain: String) -> Self {
        Self {
            context: ResolvedContext::NotFound,
            tenant: None,
            access_method: None,
            subdomain: Some(subdomain),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdatePaymentSettingsRequest {
    #[validate(length(min = 1, max = 40))]
    pub provider: String,
    pub enabled: bool,
    pub public_key: Option<String>,
    /// Omit to keep the stored secret.
    pub secret_key: Option<String>,
    pub test_mode: bool,
}

/// Payment settings as shown to admins. The secret never leaves the server.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentSettingsView {
    pub provider: String,
    pub enabled: bool,
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
    pub test_mode: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaymentSettingsView {
    pub fn unconfigured() -> Self {
        Self {
            provider: "stripe".into(),
            enabled: false,
            public_key: None,
            secret_key: None,
            test_mode: true,
            updated_at: None,
        }
    }
}

impl From<payment_settings::Model> for PaymentSettingsView {
    fn from(model: payment_settings::Model) -> Self {
        Self {
            provider: model.provider,
            enabled: model.enabled,
            public_key: model.public_key,
            secret_key: model.secret_key.as_deref().map(mask_secret),
            test_mode: model.test_mode,
            updated_at: Some(model.updated_at.with_timezone(&Utc)),
        }
    }
}

/// Keeps the last four characters so admins can tell keys apart.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".into();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UploadRequest {
    /// One of `products`, `categories`, `brands`, `branding`.
    pub category: String,
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadTicket {
    pub bucket: String,
    pub path: String,
    pub public_url: String,
}

#[cfg(test)]
mod tests {
    use super::mask_secret;

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret("sk_test_abcdef1234"), "****1234");
        assert_eq!(mask_secret("abc"), "****");
    }
}
