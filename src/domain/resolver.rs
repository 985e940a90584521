//! Hostname → tenant resolution.
//!
//! Classification of the host is pure; the two directory lookups go through
//! [`TenantDirectory`] so the resolver can be exercised against any backing
//! store.

use std::future::Future;
use std::net::IpAddr;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::Tenant};

const LOCALHOST: &str = "localhost";
const WWW: &str = "www";

/// Base domains under which tenants get a subdomain.
#[derive(Debug, Clone)]
pub struct DomainSettings {
    /// Production domain, possibly multi-level (`shops.example.co.uk`).
    pub platform_domain: String,
    /// Preview deployments live at `<project>.<suffix>`.
    pub preview_suffix: Option<String>,
}

/// What a hostname looks like before any lookup happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostClass {
    /// The platform's own domain, its `www` alias, `localhost`, or a preview root.
    Platform,
    /// A label under one of the base domains.
    Subdomain { host: String, subdomain: String },
    /// Anything else. May be a tenant's custom domain.
    External { host: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessMethod {
    Subdomain,
    CustomDomain,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Platform,
    Tenant { tenant: Tenant, access: AccessMethod },
    /// A subdomain was present but no active tenant owns it.
    NotFound { subdomain: String },
}

/// Lookup of active tenants by routing key.
pub trait TenantDirectory {
    fn find_active_by_domain(
        &self,
        domain: &str,
    ) -> impl Future<Output = AppResult<Option<Tenant>>> + Send;

    fn find_active_by_subdomain(
        &self,
        subdomain: &str,
    ) -> impl Future<Output = AppResult<Option<Tenant>>> + Send;
}

/// Lowercases, drops a trailing `:port` and a trailing root dot.
pub fn normalize_host(raw: &str) -> String {
    let host = raw.trim().to_ascii_lowercase();
    let host = if let Some(rest) = host.strip_prefix('[') {
        // bracketed IPv6, optionally with a port
        rest.split(']').next().unwrap_or_default().to_string()
    } else {
        match host.rsplit_once(':') {
            Some((name, port))
                if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) =>
            {
                name.to_string()
            }
            _ => host,
        }
    };
    host.trim_end_matches('.').to_string()
}

pub fn classify_host(raw: &str, settings: &DomainSettings) -> HostClass {
    let host = normalize_host(raw);
    if host.is_empty() || host == LOCALHOST || host.parse::<IpAddr>().is_ok() {
        return HostClass::Platform;
    }

    let platform = settings.platform_domain.trim().to_ascii_lowercase();
    if !platform.is_empty() {
        if host == platform {
            return HostClass::Platform;
        }
        if let Some(leftover) = strip_base(&host, &platform) {
            return subdomain_or_platform(&host, leftover);
        }
    }

    if let Some(suffix) = settings
        .preview_suffix
        .as_deref()
        .map(str::to_ascii_lowercase)
        .filter(|s| !s.is_empty())
    {
        if let Some(leftover) = strip_base(&host, &suffix) {
            // `<project>.vercel.app` is the deployment itself
            return match leftover.split_once('.') {
                Some((label, _)) => subdomain_or_platform(&host, label),
                None => HostClass::Platform,
            };
        }
    }

    if let Some(leftover) = strip_base(&host, LOCALHOST) {
        return subdomain_or_platform(&host, leftover);
    }

    HostClass::External { host }
}

/// Runs the full resolution: custom domain first, then subdomain.
pub async fn resolve_host<D>(
    directory: &D,
    raw_host: &str,
    settings: &DomainSettings,
) -> AppResult<Resolution>
where
    D: TenantDirectory + Sync,
{
    let (host, subdomain) = match classify_host(raw_host, settings) {
        HostClass::Platform => return Ok(Resolution::Platform),
        HostClass::Subdomain { host, subdomain } => (host, Some(subdomain)),
        HostClass::External { host } => (host, None),
    };

    if let Some(tenant) = directory.find_active_by_domain(&host).await? {
        return Ok(Resolution::Tenant {
            tenant,
            access: AccessMethod::CustomDomain,
        });
    }

    let Some(subdomain) = subdomain else {
        return Ok(Resolution::Platform);
    };

    match directory.find_active_by_subdomain(&subdomain).await? {
        Some(tenant) => Ok(Resolution::Tenant {
            tenant,
            access: AccessMethod::Subdomain,
        }),
        None => Ok(Resolution::NotFound { subdomain }),
    }
}

fn strip_base<'a>(host: &'a str, base: &str) -> Option<&'a str> {
    host.strip_suffix(base)
        .and_then(|rest| rest.strip_suffix('.'))
        .filter(|rest| !rest.is_empty())
}

fn subdomain_or_platform(host: &str, leftover: &str) -> HostClass {
    let label = leftover.split('.').next().unwrap_or_default();
    if label.is_empty() || label == WWW {
        return HostClass::Platform;
    }
    HostClass::Subdomain {
        host: host.to_string(),
        subdomain: label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DomainSettings {
        DomainSettings {
            platform_domain: "shops.example.com".into(),
            preview_suffix: Some("vercel.app".into()),
        }
    }

    fn sub(host: &str, subdomain: &str) -> HostClass {
        HostClass::Subdomain {
            host: host.into(),
            subdomain: subdomain.into(),
        }
    }

    #[test]
    fn port_and_case_are_normalized() {
        assert_eq!(normalize_host("Acme.Shops.Example.com:3000"), "acme.shops.example.com");
        assert_eq!(normalize_host("example.org."), "example.org");
        assert_eq!(normalize_host("[::1]:8080"), "::1");
    }

    #[test]
    fn platform_domain_and_www_are_never_tenants() {
        let s = settings();
        assert_eq!(classify_host("shops.example.com", &s), HostClass::Platform);
        assert_eq!(classify_host("www.shops.example.com:443", &s), HostClass::Platform);
        assert_eq!(classify_host("localhost:3000", &s), HostClass::Platform);
        assert_eq!(classify_host("127.0.0.1:3000", &s), HostClass::Platform);
    }

    #[test]
    fn subdomain_under_multi_level_domain() {
        let s = settings();
        assert_eq!(
            classify_host("acme.shops.example.com", &s),
            sub("acme.shops.example.com", "acme")
        );
        assert_eq!(
            classify_host("deep.acme.shops.example.com", &s),
            sub("deep.acme.shops.example.com", "deep")
        );
    }

    #[test]
    fn preview_root_is_platform_but_nested_label_is_tenant() {
        let s = settings();
        assert_eq!(classify_host("my-project.vercel.app", &s), HostClass::Platform);
        assert_eq!(
            classify_host("acme.my-project.vercel.app", &s),
            sub("acme.my-project.vercel.app", "acme")
        );
    }

    #[test]
    fn localhost_subdomain_for_development() {
        assert_eq!(
            classify_host("acme.localhost:3000", &settings()),
            sub("acme.localhost", "acme")
        );
    }

    #[test]
    fn unrelated_host_is_external() {
        assert_eq!(
            classify_host("store.acme.com", &settings()),
            HostClass::External {
                host: "store.acme.com".into()
            }
        );
    }
}
