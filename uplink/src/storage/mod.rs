//! Blob storage provider abstraction layer
//!
//! This module defines the `StorageProvider` trait which abstracts the blob store used for
//! client uploads. Uploads never pass through this service: clients request a scoped client
//! token here, upload directly to the store, and the store calls back with a signed
//! upload-completed notification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::StorageConfig;

pub mod dummy;
pub mod managed;

/// How long a minted client token stays valid.
pub const CLIENT_TOKEN_VALIDITY: Duration = Duration::from_secs(60 * 60);

/// Create a storage provider from configuration
///
/// This is the single point where we convert config into provider instances.
/// Adding a new provider requires adding a match arm here.
pub fn create_provider(config: &StorageConfig) -> anyhow::Result<Arc<dyn StorageProvider>> {
    match config {
        StorageConfig::Managed { token, callback_url } => {
            Ok(Arc::new(managed::ManagedProvider::new(token, callback_url.clone())?))
        }
        StorageConfig::Dummy => Ok(Arc::new(dummy::DummyProvider::new())),
    }
}

/// Result type for storage provider operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while brokering uploads
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Store token is malformed")]
    MalformedStoreToken,

    #[error("Upload grant could not be encoded: {0}")]
    GrantEncoding(String),

    #[error("Missing callback signature header")]
    MissingSignature,

    #[error("Invalid callback signature")]
    SignatureMismatch,

    /// Error reported by the store's API, passed through verbatim so callers can
    /// surface the store's own message.
    #[error("{0}")]
    ProviderApi(String),
}

/// The scoped permissions encoded into a client token.
///
/// This is what the uploading browser presents to the store, so it carries everything the
/// store needs to enforce the upload policy and to call back when the upload completes.
/// Field names follow the store's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenGrant {
    /// Path the upload must be stored under
    pub pathname: String,
    /// Callback the store invokes once the upload lands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_upload_completed: Option<UploadCompletionHook>,
    /// Upper bound on the uploaded file size, in bytes
    pub maximum_size_in_bytes: u64,
    /// Content types the store will accept for this upload
    pub allowed_content_types: Vec<String>,
    /// Expiry of this token as a unix timestamp in milliseconds
    pub valid_until: i64,
}

/// Where and with what context the store reports a completed upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompletionHook {
    /// URL of this service's upload endpoint
    pub callback_url: String,
    /// Opaque state echoed back in the completion callback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_payload: Option<String>,
}

/// Abstract blob store interface
///
/// Implementors broker direct-to-store uploads: minting client tokens and authenticating the
/// store's completion callbacks.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Mint a scoped client token for a direct-to-store upload.
    ///
    /// Providers configured with a callback URL override rewrite the grant's completion hook
    /// to point at it (useful behind tunnels where the client-visible URL is not reachable
    /// from the store).
    async fn grant_client_token(&self, grant: &ClientTokenGrant) -> Result<String>;

    /// Verify that an upload-completed callback genuinely came from the store.
    ///
    /// `body` is the raw request body exactly as received; the signature covers every byte.
    async fn verify_callback(&self, headers: &axum::http::HeaderMap, body: &str) -> Result<()>;
}
