use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::shipping::{CartLine, Destination};

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ShippingQuoteRequest {
    #[validate(length(min = 1, message = "cart is empty"))]
    pub items: Vec<CartLine>,
    pub destination: Option<Destination>,
}
