//! OpenAPI documentation for the gateway API.
//!
//! Defines the OpenAPI document served at `/docs`, covering the chat, model
//! catalog, and file upload endpoints under `/api/*`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::ai::catalog::{ChatModelDescriptor, LanguageModelSlot};
use crate::ai::providers::ChatMessage;
use crate::api;

/// Security schemes for the gateway API (session JWT as bearer token or cookie).
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session JWT authentication. Include the token in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_SESSION_TOKEN\n```\n\n\
                            Session tokens are minted by the frontend auth layer and signed with the shared secret.",
                        ))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "uplink_session",
                    "Session JWT carried in a cookie. The cookie name is configurable via \
                     `auth.session.cookie_name` and defaults to `uplink_session`.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        api::handlers::chat::chat,
        api::handlers::models::list_models,
        api::handlers::uploads::upload,
    ),
    components(
        schemas(
            // Chat types
            api::models::chat::ChatRequest,
            ChatMessage,
            // Model catalog types
            api::models::models::ModelsResponse,
            ChatModelDescriptor,
            LanguageModelSlot,
            // Upload protocol types
            api::models::uploads::UploadEnvelope,
            api::models::uploads::TokenRequestPayload,
            api::models::uploads::UploadCompletedPayload,
            api::models::uploads::PutBlobResult,
            api::models::uploads::UploadResponse,
            // Identity
            api::models::users::CurrentUser,
        )
    ),
    tags(
        (name = "chat", description = "Stream model responses for chat conversations.

Responses are delivered as server-sent events. Each event carries a JSON object with a `type` field:
- `text` — a delta of answer text
- `reasoning` — a delta of the model's thinking (reasoning models only)
- `error` — the stream failed partway through
- `finish` — the stream completed

Pick a model with the `model` field, or omit it to use the default."),
        (name = "models", description = "Discover the chat models users can pick from.

The response lists each model's ID, display name, and description, plus the ID served when a chat request names no model."),
        (name = "files", description = "Broker direct-to-store file uploads.

The endpoint speaks both phases of the client-upload protocol:
- `blob.generate-client-token` — the browser asks for a scoped client token before uploading
- `blob.upload-completed` — the store confirms a finished upload with a signed callback

Granted tokens cap uploads at 5MB and restrict content types to JPEG, PNG, and PDF."),
    ),
    info(
        title = "Uplink API",
        version = "1.0.0",
        description = "Backend gateway for the chat frontend: streaming chat completions, the model catalog, and brokered file uploads.

## Authentication

All endpoints require a session JWT, passed either as a bearer token:

```
Authorization: Bearer YOUR_SESSION_TOKEN
```

or in the session cookie (`uplink_session` by default).

## Errors

Authentication and upload protocol errors carry a JSON body:

```json
{
  \"error\": \"Unauthorized\"
}
```

Other errors return a plain-text message with the appropriate status code.

## Streaming

Chat completions stream as server-sent events with `data:` prefixed JSON chunks. The stream always ends with a `finish` event.",
    ),
)]
pub struct ApiDoc;
