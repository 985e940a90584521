use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{domain::plans::Plan, models::Tenant, routes::params::Pagination};

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub subdomain: String,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(length(min = 2, max = 10))]
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlatformTenantUpdate {
    pub is_active: Option<bool>,
    pub plan: Option<Plan>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TenantListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub active: Option<bool>,
}

impl TenantListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct TenantList {
    #[schema(value_type = Vec<Tenant>)]
    pub items: Vec<Tenant>,
}
