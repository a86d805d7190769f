//! HTTP handlers for model discovery.

use axum::Json;

use crate::{
    ai::catalog::{ChatModelDescriptor, DEFAULT_CHAT_MODEL},
    api::models::{models::ModelsResponse, users::CurrentUser},
};

#[utoipa::path(
    get,
    path = "/api/models",
    tag = "models",
    summary = "List selectable chat models",
    description = "Returns the chat models users can pick from, plus the default model served \
                   when a request names none",
    responses(
        (status = 200, description = "Available chat models", body = ModelsResponse),
        (status = 401, description = "Missing or invalid session"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_models(_user: CurrentUser) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: ChatModelDescriptor::ALL.to_vec(),
        default_model_id: DEFAULT_CHAT_MODEL,
    })
}
