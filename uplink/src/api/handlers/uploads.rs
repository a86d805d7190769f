//! HTTP handlers for file upload brokering.
//!
//! One route serves both sides of the client-upload protocol: the browser posts a
//! token request before uploading, and the blob store posts a signed callback once the
//! upload lands. Blobs themselves never pass through this service.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::json;
use tracing::info;

use crate::{
    api::models::{
        uploads::{
            TokenRequestPayload, UploadCompletedPayload, UploadEnvelope, UploadResponse,
            ALLOWED_UPLOAD_CONTENT_TYPES, MAX_UPLOAD_SIZE_BYTES,
        },
        users::CurrentUser,
    },
    errors::{Error, Result},
    storage::{ClientTokenGrant, UploadCompletionHook, CLIENT_TOKEN_VALIDITY},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    summary = "Broker a direct-to-store upload",
    description = "Serves both phases of the client-upload protocol: grants scoped client tokens \
                   to the uploading browser, and acknowledges the store's signed upload-completed \
                   callbacks",
    request_body = UploadEnvelope,
    responses(
        (status = 200, description = "Token granted or completion acknowledged", body = UploadResponse),
        (status = 400, description = "Empty body, malformed envelope, or rejected protocol request"),
        (status = 401, description = "Missing or invalid session"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    _user: CurrentUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    if body.is_empty() {
        return Err(Error::EmptyBody);
    }

    // The caller retries failed protocol requests, so every failure below maps to a 400
    // with the message in the body rather than an opaque 500
    let envelope: UploadEnvelope = serde_json::from_slice(&body).map_err(|e| Error::UploadProtocol {
        message: format!("Invalid upload envelope: {e}"),
    })?;

    match envelope {
        UploadEnvelope::GenerateClientToken { payload } => grant_token(&state, payload).await,
        UploadEnvelope::UploadCompleted { payload } => {
            let raw_body = std::str::from_utf8(&body).map_err(|e| Error::UploadProtocol {
                message: format!("Callback body is not valid UTF-8: {e}"),
            })?;
            complete_upload(&state, &headers, raw_body, payload).await
        }
    }
}

/// Mint a client token scoped to the requested path and the upload policy.
async fn grant_token(state: &AppState, payload: TokenRequestPayload) -> Result<Json<UploadResponse>> {
    // Echoed back by the store in the completion callback, tying the blob to the request
    let token_payload = json!({ "pathname": payload.pathname }).to_string();

    let grant = ClientTokenGrant {
        pathname: payload.pathname,
        on_upload_completed: Some(UploadCompletionHook {
            callback_url: payload.callback_url,
            token_payload: Some(token_payload),
        }),
        maximum_size_in_bytes: MAX_UPLOAD_SIZE_BYTES,
        allowed_content_types: ALLOWED_UPLOAD_CONTENT_TYPES.iter().map(|t| t.to_string()).collect(),
        valid_until: chrono::Utc::now().timestamp_millis() + CLIENT_TOKEN_VALIDITY.as_millis() as i64,
    };

    let client_token = state
        .storage
        .grant_client_token(&grant)
        .await
        .map_err(|e| Error::UploadProtocol { message: e.to_string() })?;

    info!(pathname = %grant.pathname, "Granted client upload token");
    Ok(Json(UploadResponse::token_granted(client_token)))
}

/// Acknowledge a store callback after authenticating its signature.
async fn complete_upload(
    state: &AppState,
    headers: &HeaderMap,
    raw_body: &str,
    payload: UploadCompletedPayload,
) -> Result<Json<UploadResponse>> {
    state
        .storage
        .verify_callback(headers, raw_body)
        .await
        .map_err(|e| Error::UploadProtocol { message: e.to_string() })?;

    info!(
        url = %payload.blob.url,
        pathname = %payload.blob.pathname,
        token_payload = payload.token_payload.as_deref().unwrap_or(""),
        "Upload completed"
    );

    Ok(Json(UploadResponse::completed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::create_session_token;
    use crate::storage::managed::{decode_client_token, sign_payload, SIGNATURE_HEADER};
    use crate::storage::{StorageError, StorageProvider};
    use crate::test_utils::{
        create_test_config, create_test_server, create_test_state, test_user, TEST_STORE_TOKEN,
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::Value;
    use std::sync::Arc;

    fn authed_server() -> (TestServer, String) {
        let config = create_test_config();
        let state = create_test_state(config.clone());
        let server = create_test_server(state);
        let token = create_session_token(&test_user(), &config).unwrap();
        (server, format!("Bearer {token}"))
    }

    fn token_request_body() -> Value {
        json!({
            "type": "blob.generate-client-token",
            "payload": {
                "pathname": "report.pdf",
                "callbackUrl": "http://localhost:3000/api/files/upload",
                "clientPayload": null,
                "multipart": false
            }
        })
    }

    fn completion_body() -> String {
        json!({
            "type": "blob.upload-completed",
            "payload": {
                "blob": {
                    "url": "https://store.example.com/report.pdf",
                    "pathname": "report.pdf",
                    "contentType": "application/pdf"
                },
                "tokenPayload": "{\"pathname\":\"report.pdf\"}"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_upload_requires_session() {
        let (server, _bearer) = authed_server();

        let response = server.post("/api/files/upload").json(&token_request_body()).await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body, json!({ "error": "Unauthorized" }));
    }

    #[tokio::test]
    async fn test_unauthenticated_rejected_even_with_empty_body() {
        let (server, _bearer) = authed_server();

        let response = server.post("/api/files/upload").await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let (server, bearer) = authed_server();

        let response = server
            .post("/api/files/upload")
            .add_header("authorization", bearer.as_str())
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Request body is empty");
    }

    #[tokio::test]
    async fn test_malformed_envelope_rejected() {
        let (server, bearer) = authed_server();

        let response = server
            .post("/api/files/upload")
            .add_header("authorization", bearer.as_str())
            .json(&json!({ "type": "blob.delete", "payload": {} }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Invalid upload envelope"), "got: {message}");
    }

    #[tokio::test]
    async fn test_token_request_grants_scoped_token() {
        let (server, bearer) = authed_server();

        let response = server
            .post("/api/files/upload")
            .add_header("authorization", bearer.as_str())
            .json(&token_request_body())
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["type"], "blob.generate-client-token");

        let decoded = decode_client_token(body["clientToken"].as_str().unwrap())
            .expect("minted token should decode");
        assert_eq!(decoded.store_id, "teststore");
        assert_eq!(decoded.grant.pathname, "report.pdf");
        assert_eq!(decoded.grant.maximum_size_in_bytes, MAX_UPLOAD_SIZE_BYTES);
        assert_eq!(
            decoded.grant.allowed_content_types,
            vec!["image/jpeg", "image/png", "application/pdf"]
        );

        let hook = decoded.grant.on_upload_completed.expect("grant should carry the hook");
        assert_eq!(hook.callback_url, "http://localhost:3000/api/files/upload");
        assert_eq!(hook.token_payload.as_deref(), Some("{\"pathname\":\"report.pdf\"}"));
    }

    #[tokio::test]
    async fn test_completion_acknowledged_when_signed() {
        let (server, bearer) = authed_server();
        let body = completion_body();
        let signature = sign_payload(body.as_bytes(), TEST_STORE_TOKEN).unwrap();

        let response = server
            .post("/api/files/upload")
            .add_header("authorization", bearer.as_str())
            .add_header(SIGNATURE_HEADER, signature.as_str())
            .bytes(body.into_bytes().into())
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let parsed: Value = response.json();
        assert_eq!(parsed, json!({ "type": "blob.upload-completed", "response": "ok" }));
    }

    #[tokio::test]
    async fn test_completion_rejects_bad_signature() {
        let (server, bearer) = authed_server();
        let body = completion_body();

        let response = server
            .post("/api/files/upload")
            .add_header("authorization", bearer.as_str())
            .add_header(SIGNATURE_HEADER, "deadbeef")
            .bytes(body.into_bytes().into())
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let parsed: Value = response.json();
        assert_eq!(parsed, json!({ "error": "Invalid callback signature" }));
    }

    #[tokio::test]
    async fn test_completion_rejects_missing_signature() {
        let (server, bearer) = authed_server();
        let body = completion_body();

        let response = server
            .post("/api/files/upload")
            .add_header("authorization", bearer.as_str())
            .bytes(body.into_bytes().into())
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let parsed: Value = response.json();
        assert_eq!(parsed, json!({ "error": "Missing callback signature header" }));
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_in_error_channel() {
        struct QuotaExceededStorage;

        #[async_trait::async_trait]
        impl StorageProvider for QuotaExceededStorage {
            async fn grant_client_token(
                &self,
                _grant: &ClientTokenGrant,
            ) -> crate::storage::Result<String> {
                Err(StorageError::ProviderApi("quota exceeded".to_string()))
            }

            async fn verify_callback(
                &self,
                _headers: &HeaderMap,
                _body: &str,
            ) -> crate::storage::Result<()> {
                Ok(())
            }
        }

        let config = create_test_config();
        let mut state = create_test_state(config.clone());
        state.storage = Arc::new(QuotaExceededStorage);
        let server = create_test_server(state);
        let bearer = format!("Bearer {}", create_session_token(&test_user(), &config).unwrap());

        let response = server
            .post("/api/files/upload")
            .add_header("authorization", bearer.as_str())
            .json(&token_request_body())
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body, json!({ "error": "quota exceeded" }));
    }
}
