//! URL-safe identifiers: catalog slugs, tenant subdomains, custom domains.

const RESERVED_SUBDOMAINS: [&str; 6] = ["www", "api", "admin", "app", "platform", "mail"];

/// Lowercase ASCII words joined by single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub fn validate_subdomain(subdomain: &str) -> Result<(), String> {
    let len = subdomain.len();
    if !(3..=63).contains(&len) {
        return Err("subdomain must be between 3 and 63 characters".into());
    }
    if !subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("subdomain may only contain a-z, 0-9 and '-'".into());
    }
    if subdomain.starts_with('-') || subdomain.ends_with('-') {
        return Err("subdomain cannot start or end with '-'".into());
    }
    if RESERVED_SUBDOMAINS.contains(&subdomain) {
        return Err(format!("subdomain '{subdomain}' is reserved"));
    }
    Ok(())
}

/// Custom domains need at least one dot and hostname-safe labels.
pub fn validate_custom_domain(domain: &str, platform_domain: &str) -> Result<(), String> {
    let domain = domain.trim().trim_end_matches('.');
    if domain.len() > 253 || !domain.contains('.') {
        return Err("domain must be a fully qualified hostname".into());
    }
    let platform = platform_domain.to_ascii_lowercase();
    if domain == platform || domain.ends_with(&format!(".{platform}")) {
        return Err("domain cannot be under the platform domain".into());
    }
    let labels_ok = domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    });
    if !labels_ok {
        return Err("domain contains an invalid label".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Summer Tee — Blue/XL "), "summer-tee-blue-xl");
        assert_eq!(slugify("Café 2000"), "caf-2000");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn subdomain_rules() {
        assert!(validate_subdomain("acme-shop").is_ok());
        assert!(validate_subdomain("ab").is_err());
        assert!(validate_subdomain("Acme").is_err());
        assert!(validate_subdomain("-acme").is_err());
        assert!(validate_subdomain("www").is_err());
    }

    #[test]
    fn custom_domain_rules() {
        assert!(validate_custom_domain("shop.acme.com", "example.com").is_ok());
        assert!(validate_custom_domain("acme", "example.com").is_err());
        assert!(validate_custom_domain("acme.example.com", "example.com").is_err());
        assert!(validate_custom_domain("bad_label.com", "example.com").is_err());
    }
}
