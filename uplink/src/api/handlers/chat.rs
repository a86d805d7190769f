//! HTTP handlers for streaming chat completions.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Json,
};
use futures::{stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use tracing::{info, warn};

use crate::{
    ai::catalog::DEFAULT_CHAT_MODEL,
    ai::providers::StreamPart,
    api::models::{chat::ChatRequest, users::CurrentUser},
    errors::{Error, Result},
    types::abbrev_uuid,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    summary = "Stream a chat completion",
    description = "Streams model output as server-sent events. Reasoning models emit their \
                   thinking as separate reasoning deltas ahead of the answer text",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Server-sent event stream of completion deltas"),
        (status = 401, description = "Missing or invalid session"),
        (status = 404, description = "Unknown model id"),
        (status = 502, description = "Model provider request failed"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse> {
    let model_id = request.model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL);
    let (slot, model) = state
        .registry
        .resolve_chat_model(model_id)
        .ok_or_else(|| Error::NotFound {
            resource: "Model".to_string(),
            id: model_id.to_string(),
        })?;

    info!(user = %abbrev_uuid(&user.id), model = slot.id(), "Starting chat completion stream");

    let parts = model
        .stream_chat(request.messages)
        .await
        .map_err(|e| Error::Upstream {
            service: "model provider".to_string(),
            message: e.to_string(),
        })?;

    let events = parts
        .map(|part| {
            let payload = match part {
                Ok(StreamPart::Text(delta)) => json!({ "type": "text", "delta": delta }),
                Ok(StreamPart::Reasoning(delta)) => json!({ "type": "reasoning", "delta": delta }),
                Err(e) => {
                    warn!("Chat stream failed mid-response: {e}");
                    json!({ "type": "error", "message": e.to_string() })
                }
            };
            Ok::<_, Infallible>(Event::default().data(payload.to_string()))
        })
        .chain(stream::once(async {
            Ok::<_, Infallible>(Event::default().data(json!({ "type": "finish" }).to_string()))
        }));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
