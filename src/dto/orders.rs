use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::order_status::{FinancialStatus, FulfillmentStatus},
    models::{Order, OrderLineItem},
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct CustomerInfo {
    #[validate(email)]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// One cart line, snapshotted onto the order as submitted.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub title: String,
    pub variant_title: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub track_inventory: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    #[serde(default)]
    pub shipping: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateOrderRequest {
    #[validate(nested)]
    #[serde(default)]
    pub customer: CustomerInfo,
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub billing_address: Option<Value>,
    pub shipping_method_id: Option<String>,
    pub payment_method: Option<String>,
    /// Initial financial status; `pending` when absent.
    pub payment_status: Option<FinancialStatus>,
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    pub items: Vec<OrderItemInput>,
    pub totals: OrderTotals,
    pub currency: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LineFailure {
    pub index: usize,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub error: String,
}

/// Side effects that did not land. The order itself exists regardless.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct OrderReconciliation {
    pub line_item_failures: Vec<LineFailure>,
    pub inventory_failures: Vec<LineFailure>,
}

impl OrderReconciliation {
    pub fn is_clean(&self) -> bool {
        self.line_item_failures.is_empty() && self.inventory_failures.is_empty()
    }
}

#[derive(Serialize, ToSchema)]
pub struct OrderCreated {
    pub order: Order,
    pub items: Vec<OrderLineItem>,
    pub reconciliation: OrderReconciliation,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub financial_status: Option<FinancialStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}

#[derive(Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderLineItem>,
}
