use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Customer;

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CustomerList {
    #[schema(value_type = Vec<Customer>)]
    pub items: Vec<Customer>,
}

#[derive(Serialize, ToSchema)]
pub struct CustomerDetail {
    pub customer: Customer,
    pub order_count: i64,
    pub is_guest: bool,
}
