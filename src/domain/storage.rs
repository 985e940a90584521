use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadCategory {
    Products,
    Categories,
    Brands,
    Branding,
}

impl UploadCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadCategory::Products => "products",
            UploadCategory::Categories => "categories",
            UploadCategory::Brands => "brands",
            UploadCategory::Branding => "branding",
        }
    }
}

impl FromStr for UploadCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(UploadCategory::Products),
            "categories" => Ok(UploadCategory::Categories),
            "brands" => Ok(UploadCategory::Brands),
            "branding" => Ok(UploadCategory::Branding),
            other => Err(format!("unknown upload category '{other}'")),
        }
    }
}

const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "gif", "svg"];

/// `{tenant}/{category}/{millis}-{short id}.{ext}`
pub fn object_path(
    tenant_id: Uuid,
    category: UploadCategory,
    original_filename: &str,
    now: DateTime<Utc>,
) -> Result<String, String> {
    let extension = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| format!("unsupported file type: {original_filename}"))?;

    let id = Uuid::new_v4().simple().to_string();
    Ok(format!(
        "{tenant_id}/{}/{}-{}.{extension}",
        category.as_str(),
        now.timestamp_millis(),
        &id[..8]
    ))
}

/// Public URL of an object; derived, never stored.
pub fn public_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        bucket.trim_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_scoped_by_tenant_and_category() {
        let tenant = Uuid::new_v4();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let path = object_path(tenant, UploadCategory::Products, "Shirt.PNG", now).unwrap();

        let mut parts = path.split('/');
        assert_eq!(parts.next(), Some(tenant.to_string().as_str()));
        assert_eq!(parts.next(), Some("products"));
        let file = parts.next().unwrap();
        assert!(file.starts_with("1700000000000-"));
        assert!(file.ends_with(".png"));
    }

    #[test]
    fn rejects_unknown_extensions() {
        let now = Utc::now();
        assert!(object_path(Uuid::new_v4(), UploadCategory::Brands, "run.exe", now).is_err());
        assert!(object_path(Uuid::new_v4(), UploadCategory::Brands, "noext", now).is_err());
    }

    #[test]
    fn public_url_joins_cleanly() {
        assert_eq!(
            public_url("https://cdn.example.com/storage/v1/object/public/", "/images/", "/a/b.png"),
            "https://cdn.example.com/storage/v1/object/public/images/a/b.png"
        );
    }
}
