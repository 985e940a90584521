use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Invitation;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateInvitationRequest {
    #[validate(email)]
    pub email: String,
    /// `admin` or `staff`; defaults to `staff`.
    pub role: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct InvitationList {
    #[schema(value_type = Vec<Invitation>)]
    pub items: Vec<Invitation>,
}
