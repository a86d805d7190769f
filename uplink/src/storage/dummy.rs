//! Dummy storage provider for development and testing
//!
//! Mints unsigned client tokens and accepts every callback without checking signatures.
//! Useful for local development where no real blob store is wired up.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::info;

use super::{ClientTokenGrant, Result, StorageError, StorageProvider};

/// Storage provider that trusts everything.
#[derive(Debug, Default)]
pub struct DummyProvider;

impl DummyProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageProvider for DummyProvider {
    async fn grant_client_token(&self, grant: &ClientTokenGrant) -> Result<String> {
        info!(pathname = %grant.pathname, "Dummy storage: minting unsigned client token");

        let grant_json = serde_json::to_string(grant)
            .map_err(|e| StorageError::GrantEncoding(e.to_string()))?;
        // Same shape as a managed token so clients can decode it, but with an empty signature
        Ok(format!(
            "blob_client_dummy_{}",
            BASE64.encode(format!(".{grant_json}"))
        ))
    }

    async fn verify_callback(&self, _headers: &axum::http::HeaderMap, _body: &str) -> Result<()> {
        info!("Dummy storage: accepting callback without signature check");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::managed::decode_client_token;
    use axum::http::HeaderMap;

    fn sample_grant() -> ClientTokenGrant {
        ClientTokenGrant {
            pathname: "photo.png".to_string(),
            on_upload_completed: None,
            maximum_size_in_bytes: 1024,
            allowed_content_types: vec!["image/png".to_string()],
            valid_until: 0,
        }
    }

    #[tokio::test]
    async fn test_dummy_token_decodes() {
        let provider = DummyProvider::new();
        let token = provider.grant_client_token(&sample_grant()).await.unwrap();

        let decoded = decode_client_token(&token).expect("dummy token should decode");
        assert_eq!(decoded.store_id, "dummy");
        assert_eq!(decoded.signature, "");
        assert_eq!(decoded.grant, sample_grant());
    }

    #[tokio::test]
    async fn test_dummy_accepts_any_callback() {
        let provider = DummyProvider::new();
        assert!(provider
            .verify_callback(&HeaderMap::new(), "arbitrary body")
            .await
            .is_ok());
    }
}
