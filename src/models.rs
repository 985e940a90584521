use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        inventory::{ProductType, StockSummary, Variant},
        order_status::{FinancialStatus, FulfillmentStatus},
        plans::Plan,
    },
    entity::{
        brands, categories, customers, order_line_items, orders, product_variants, subscriptions,
        tenant_invitations, tenants,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TenantSettings {
    pub currency: String,
    pub locale: String,
    pub low_stock_threshold: Option<i64>,
    #[schema(value_type = Vec<Object>)]
    pub shipping_methods: Vec<Value>,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            locale: "en".to_string(),
            low_stock_threshold: None,
            shipping_methods: Vec::new(),
        }
    }
}

impl TenantSettings {
    /// Field-by-field read of the stored JSON; bad fields fall back to defaults.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        Self {
            currency: value
                .get("currency")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_uppercase)
                .unwrap_or(defaults.currency),
            locale: value
                .get("locale")
                .and_then(Value::as_str)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or(defaults.locale),
            low_stock_threshold: value.get("low_stock_threshold").and_then(|t| match t {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }),
            shipping_methods: value
                .get("shipping_methods")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "currency": self.currency,
            "locale": self.locale,
            "low_stock_threshold": self.low_stock_threshold,
            "shipping_methods": self.shipping_methods,
        })
    }

    pub fn shipping_methods_value(&self) -> Value {
        Value::Array(self.shipping_methods.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub domain: Option<String>,
    pub is_active: bool,
    pub plan: Plan,
    pub owner_id: Option<Uuid>,
    pub gateway_customer_id: Option<String>,
    pub settings: TenantSettings,
    #[schema(value_type = Object)]
    pub theme: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn low_stock_threshold(&self, fallback: i64) -> i64 {
        self.settings.low_stock_threshold.unwrap_or(fallback)
    }
}

impl From<tenants::Model> for Tenant {
    fn from(model: tenants::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            subdomain: model.subdomain,
            domain: model.domain,
            is_active: model.is_active,
            plan: model.plan.parse().unwrap_or_default(),
            owner_id: model.owner_id,
            gateway_customer_id: model.gateway_customer_id,
            settings: TenantSettings::from_value(&model.settings),
            theme: model.theme,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// What a storefront visitor may see about the tenant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Storefront {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub domain: Option<String>,
    pub currency: String,
    pub locale: String,
    #[schema(value_type = Object)]
    pub theme: Value,
}

impl From<&Tenant> for Storefront {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            subdomain: tenant.subdomain.clone(),
            domain: tenant.domain.clone(),
            currency: tenant.settings.currency.clone(),
            locale: tenant.settings.locale.clone(),
            theme: tenant.theme.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            sort_order: model.sort_order,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<brands::Model> for Brand {
    fn from(model: brands::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            sort_order: model.sort_order,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub inventory_quantity: i64,
    pub is_active: bool,
    #[schema(value_type = Object)]
    pub options: Value,
}

impl From<product_variants::Model> for ProductVariant {
    fn from(model: product_variants::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            title: model.title,
            sku: model.sku,
            price: model.price,
            compare_price: model.compare_price,
            inventory_quantity: model.inventory_quantity,
            is_active: model.is_active,
            options: model.options,
        }
    }
}

impl From<&ProductVariant> for Variant {
    fn from(row: &ProductVariant) -> Self {
        Variant {
            id: Some(row.id.to_string()),
            title: Some(row.title.clone()),
            sku: row.sku.clone(),
            price: row.price,
            compare_price: row.compare_price,
            inventory_quantity: row.inventory_quantity,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub product_type: ProductType,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub sku: Option<String>,
    pub inventory_quantity: i64,
    pub track_inventory: bool,
    pub is_active: bool,
    pub is_featured: bool,
    #[schema(value_type = Vec<String>)]
    pub images: Value,
    pub variants: Vec<ProductVariant>,
    pub stock: StockSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub addresses: Value,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}

impl From<customers::Model> for Customer {
    fn from(model: customers::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            phone: model.phone,
            addresses: model.addresses,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub order_number: String,
    pub email: Option<String>,
    pub financial_status: FinancialStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_method: Option<String>,
    pub subtotal: Decimal,
    pub shipping_total: Decimal,
    pub tax_total: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub shipping_method_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub billing_address: Option<Value>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            order_number: model.order_number,
            email: model.email,
            financial_status: model
                .financial_status
                .parse()
                .unwrap_or(FinancialStatus::Pending),
            fulfillment_status: model
                .fulfillment_status
                .parse()
                .unwrap_or(FulfillmentStatus::Unfulfilled),
            payment_method: model.payment_method,
            subtotal: model.subtotal,
            shipping_total: model.shipping_total,
            tax_total: model.tax_total,
            discount_total: model.discount_total,
            total: model.total,
            currency: model.currency,
            shipping_method_id: model.shipping_method_id,
            shipping_address: model.shipping_address,
            billing_address: model.billing_address,
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderLineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub title: String,
    pub variant_title: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<order_line_items::Model> for OrderLineItem {
    fn from(model: order_line_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            variant_id: model.variant_id,
            title: model.title,
            variant_title: model.variant_title,
            sku: model.sku,
            price: model.price,
            quantity: model.quantity,
            total: model.total,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub gateway_subscription_id: String,
    pub gateway_customer_id: Option<String>,
    pub plan: Plan,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

impl From<subscriptions::Model> for Subscription {
    fn from(model: subscriptions::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            gateway_subscription_id: model.gateway_subscription_id,
            gateway_customer_id: model.gateway_customer_id,
            plan: model.plan.parse().unwrap_or_default(),
            status: model.status,
            current_period_start: model.current_period_start.map(|dt| dt.with_timezone(&Utc)),
            current_period_end: model.current_period_end.map(|dt| dt.with_timezone(&Utc)),
            cancel_at_period_end: model.cancel_at_period_end,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub token: String,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<tenant_invitations::Model> for Invitation {
    fn from(model: tenant_invitations::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            role: model.role,
            token: model.token,
            accepted_at: model.accepted_at.map(|dt| dt.with_timezone(&Utc)),
            expires_at: model.expires_at.with_timezone(&Utc),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
