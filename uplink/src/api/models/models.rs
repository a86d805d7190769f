//! Wire types for the model discovery endpoint.

use serde::Serialize;
use utoipa::ToSchema;

use crate::ai::catalog::ChatModelDescriptor;

/// The chat models a client can pick from.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModelsResponse {
    pub models: Vec<ChatModelDescriptor>,
    /// Slot id served when a chat request names no model
    #[schema(value_type = String)]
    pub default_model_id: &'static str,
}
