//! Wire types for the client-upload protocol.
//!
//! The upload endpoint serves two callers with one route: the uploading browser posts a
//! token request, and the blob store posts a signed upload-completed callback. Both speak
//! JSON envelopes discriminated by a `type` field, with camelCase payload fields matching
//! the store's SDK.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Largest upload a client token permits, in bytes (5 MiB).
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Content types a client token permits.
pub const ALLOWED_UPLOAD_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// An incoming request on the upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum UploadEnvelope {
    /// The browser asks for a scoped client token before uploading.
    #[serde(rename = "blob.generate-client-token")]
    GenerateClientToken { payload: TokenRequestPayload },
    /// The store reports a finished upload.
    #[serde(rename = "blob.upload-completed")]
    UploadCompleted { payload: UploadCompletedPayload },
}

/// Payload of a token request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestPayload {
    /// Path the client wants the blob stored under
    pub pathname: String,
    /// URL the store should call once the upload lands
    pub callback_url: String,
    /// Opaque client context, not interpreted by this service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_payload: Option<String>,
    /// Whether the client intends a multipart upload
    #[serde(default)]
    pub multipart: bool,
}

/// Payload of an upload-completed callback.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompletedPayload {
    /// The blob as the store now serves it
    pub blob: PutBlobResult,
    /// The opaque payload embedded in the client token at grant time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_payload: Option<String>,
}

/// A stored blob as described by the store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PutBlobResult {
    /// Canonical URL of the blob
    pub url: String,
    /// Forced-download variant of the URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Path of the blob within the store
    pub pathname: String,
    /// Content type the store recorded for the blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Content disposition the store serves the blob with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
}

/// Response sent back on the upload endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum UploadResponse {
    /// A minted client token, answering a token request.
    #[serde(rename = "blob.generate-client-token")]
    TokenGranted {
        #[serde(rename = "clientToken")]
        client_token: String,
    },
    /// Acknowledgment of a completion callback.
    #[serde(rename = "blob.upload-completed")]
    Completed { response: &'static str },
}

impl UploadResponse {
    pub fn token_granted(client_token: String) -> Self {
        Self::TokenGranted { client_token }
    }

    pub fn completed() -> Self {
        Self::Completed { response: "ok" }
    }
}

/// Observable attributes of an upload, checked against the upload policy.
#[derive(Debug, Clone, Copy)]
pub struct UploadAttributes<'a> {
    pub size_bytes: u64,
    pub content_type: &'a str,
}

/// Check an upload against the size and content-type policy.
///
/// Each rule is checked independently and contributes its own message; an upload failing
/// both rules gets both messages, joined with ", ".
pub fn validate_upload(attributes: UploadAttributes<'_>) -> Result<(), String> {
    let mut failures = Vec::new();

    if attributes.size_bytes > MAX_UPLOAD_SIZE_BYTES {
        failures.push("File size should be less than 5MB");
    }
    if !ALLOWED_UPLOAD_CONTENT_TYPES.contains(&attributes.content_type) {
        failures.push("File type should be PDF or JPEG or PNG");
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures.join(", "))
    }
}
