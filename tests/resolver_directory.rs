use std::collections::HashMap;

use chrono::Utc;
use storefront_platform::{
    domain::{
        plans::Plan,
        resolver::{AccessMethod, DomainSettings, Resolution, TenantDirectory, resolve_host},
    },
    error::AppResult,
    models::{Tenant, TenantSettings},
};
use uuid::Uuid;

#[derive(Default)]
struct Directory {
    tenants: HashMap<Uuid, Tenant>,
}

impl Directory {
    fn with(mut self, tenant: Tenant) -> Self {
        self.tenants.insert(tenant.id, tenant);
        self
    }
}

impl TenantDirectory for Directory {
    async fn find_active_by_domain(&self, domain: &str) -> AppResult<Option<Tenant>> {
        Ok(self
            .tenants
            .values()
            .find(|t| t.is_active && t.domain.as_deref() == Some(domain))
            .cloned())
    }

    async fn find_active_by_subdomain(&self, subdomain: &str) -> AppResult<Option<Tenant>> {
        Ok(self
            .tenants
            .values()
            .find(|t| t.is_active && t.subdomain == subdomain)
            .cloned())
    }
}

fn tenant(subdomain: &str, domain: Option<&str>, is_active: bool) -> Tenant {
    let now = Utc::now();
    Tenant {
        id: Uuid::new_v4(),
        name: subdomain.to_uppercase(),
        subdomain: subdomain.to_string(),
        domain: domain.map(str::to_string),
        is_active,
        plan: Plan::Starter,
        owner_id: None,
        gateway_customer_id: None,
        settings: TenantSettings::default(),
        theme: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    }
}

fn settings() -> DomainSettings {
    DomainSettings {
        platform_domain: "shops.example.com".into(),
        preview_suffix: Some("vercel.app".into()),
    }
}

#[tokio::test]
async fn subdomain_resolves_to_active_tenant() -> anyhow::Result<()> {
    let acme = tenant("acme", None, true);
    let directory = Directory::default().with(acme.clone());

    let resolved = resolve_host(&directory, "ACME.shops.example.com:443", &settings()).await?;
    assert_eq!(
        resolved,
        Resolution::Tenant {
            tenant: acme,
            access: AccessMethod::Subdomain
        }
    );
    Ok(())
}

#[tokio::test]
async fn custom_domain_resolves_before_subdomain() -> anyhow::Result<()> {
    let acme = tenant("acme", Some("shop.acme.test"), true);
    let directory = Directory::default().with(acme.clone());

    let resolved = resolve_host(&directory, "shop.acme.test", &settings()).await?;
    assert_eq!(
        resolved,
        Resolution::Tenant {
            tenant: acme,
            access: AccessMethod::CustomDomain
        }
    );
    Ok(())
}

#[tokio::test]
async fn inactive_tenant_is_not_found() -> anyhow::Result<()> {
    let directory = Directory::default().with(tenant("closed", None, false));

    let resolved = resolve_host(&directory, "closed.shops.example.com", &settings()).await?;
    assert_eq!(
        resolved,
        Resolution::NotFound {
            subdomain: "closed".into()
        }
    );
    Ok(())
}

#[tokio::test]
async fn platform_hosts_and_unknown_domains_are_platform() -> anyhow::Result<()> {
    let directory = Directory::default().with(tenant("acme", None, true));

    for host in [
        "shops.example.com",
        "www.shops.example.com",
        "localhost:3000",
        "my-project.vercel.app",
        "unknown.example.org",
    ] {
        let resolved = resolve_host(&directory, host, &settings()).await?;
        assert_eq!(resolved, Resolution::Platform, "host {host}");
    }
    Ok(())
}
