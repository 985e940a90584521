use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::{
    inventory::DEFAULT_LOW_STOCK_THRESHOLD,
    plans::{Plan, PlanTable},
    resolver::DomainSettings,
    shipping::{DeclaredWeight, NOMINAL_UNIT_WEIGHT, NominalWeight, WeightModel},
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub platform_domain: String,
    pub platform_name: String,
    pub preview_domain_suffix: Option<String>,
    pub platform_admin_emails: Vec<String>,
    pub stripe_webhook_secret: String,
    pub stripe_price_starter: Option<String>,
    pub stripe_price_pro: Option<String>,
    pub stripe_price_enterprise: Option<String>,
    pub storage_public_url: String,
    pub storage_bucket: String,
    pub shipping_nominal_weight: Decimal,
    /// Trust per-line weights sent by the storefront.
    pub shipping_declared_weight: bool,
    pub default_low_stock_threshold: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let platform_domain =
            env::var("PLATFORM_DOMAIN").unwrap_or_else(|_| "localhost".to_string());
        let platform_name =
            env::var("PLATFORM_NAME").unwrap_or_else(|_| "Storefront Platform".to_string());
        let preview_domain_suffix = match env::var("PREVIEW_DOMAIN_SUFFIX") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value),
            Err(_) => Some("vercel.app".to_string()),
        };
        let platform_admin_emails = env::var("PLATFORM_ADMIN_EMAILS")
            .map(|raw| parse_email_list(&raw))
            .unwrap_or_default();
        let shipping_nominal_weight = env::var("SHIPPING_NOMINAL_WEIGHT")
            .ok()
            .and_then(|w| Decimal::from_str(w.trim()).ok())
            .filter(|w| *w >= Decimal::ZERO)
            .unwrap_or(NOMINAL_UNIT_WEIGHT);
        let shipping_declared_weight = env::var("SHIPPING_USE_DECLARED_WEIGHT")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let default_low_stock_threshold = env::var("DEFAULT_LOW_STOCK_THRESHOLD")
            .ok()
            .and_then(|t| t.parse::<i64>().ok())
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);

        Ok(Self {
            database_url,
            host,
            port,
            platform_domain,
            platform_name,
            preview_domain_suffix,
            platform_admin_emails,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            stripe_price_starter: env::var("STRIPE_PRICE_STARTER").ok(),
            stripe_price_pro: env::var("STRIPE_PRICE_PRO").ok(),
            stripe_price_enterprise: env::var("STRIPE_PRICE_ENTERPRISE").ok(),
            storage_public_url: env::var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:54321/storage/v1/object/public".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "images".to_string()),
            shipping_nominal_weight,
            shipping_declared_weight,
            default_low_stock_threshold,
        })
    }

    /// Config for tests and tools that never read the environment.
    pub fn for_platform(database_url: &str, platform_domain: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            platform_domain: platform_domain.to_string(),
            platform_name: "Storefront Platform".to_string(),
            preview_domain_suffix: Some("vercel.app".to_string()),
            platform_admin_emails: Vec::new(),
            stripe_webhook_secret: String::new(),
            stripe_price_starter: None,
            stripe_price_pro: None,
            stripe_price_enterprise: None,
            storage_public_url: "http://localhost/storage".to_string(),
            storage_bucket: "images".to_string(),
            shipping_nominal_weight: NOMINAL_UNIT_WEIGHT,
            shipping_declared_weight: false,
            default_low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }

    pub fn domain_settings(&self) -> DomainSettings {
        DomainSettings {
            platform_domain: self.platform_domain.clone(),
            preview_suffix: self.preview_domain_suffix.clone(),
        }
    }

    pub fn plan_table(&self) -> PlanTable {
        let mut table = PlanTable::new();
        for (price, plan) in [
            (&self.stripe_price_starter, Plan::Starter),
            (&self.stripe_price_pro, Plan::Pro),
            (&self.stripe_price_enterprise, Plan::Enterprise),
        ] {
            if let Some(price) = price {
                table = table.with_price(price.clone(), plan);
            }
        }
        table
    }

    pub fn weight_model(&self) -> Box<dyn WeightModel + Send + Sync> {
        let nominal = NominalWeight(self.shipping_nominal_weight);
        if self.shipping_declared_weight {
            Box::new(DeclaredWeight(nominal))
        } else {
            Box::new(nominal)
        }
    }

    pub fn is_platform_admin(&self, email: &str) -> bool {
        let email = email.trim().to_ascii_lowercase();
        !email.is_empty() && self.platform_admin_emails.iter().any(|e| *e == email)
    }
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_allow_list_is_case_insensitive() {
        let mut config = AppConfig::for_platform("postgres://localhost/test", "example.com");
        config.platform_admin_emails = parse_email_list(" Ops@Example.com, ,root@example.com");
        assert!(config.is_platform_admin("ops@example.com"));
        assert!(config.is_platform_admin("ROOT@example.com"));
        assert!(!config.is_platform_admin("someone@example.com"));
        assert!(!config.is_platform_admin(""));
    }

    #[test]
    fn plan_table_only_includes_configured_prices() {
        let mut config = AppConfig::for_platform("postgres://localhost/test", "example.com");
        config.stripe_price_pro = Some("price_pro".into());
        let table = config.plan_table();
        assert_eq!(table.plan_for(Some("price_pro")), Plan::Pro);
        assert_eq!(table.plan_for(Some("price_enterprise")), Plan::Starter);
    }
}
