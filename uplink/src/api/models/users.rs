//! User representations shared between the auth layer and handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::UserId;

/// The authenticated user attached to a request.
///
/// Sessions are minted by the frontend auth layer; this is the subset of identity it encodes
/// into the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
}
