//! Managed blob store provider
//!
//! Speaks the client-upload protocol of a hosted blob store: client tokens are minted by
//! signing the grant with the store's read-write token, and upload-completed callbacks carry
//! an HMAC signature over the raw body that we verify before trusting the payload.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::Write;
use url::Url;

use super::{ClientTokenGrant, Result, StorageError, StorageProvider};

type HmacSha256 = Hmac<Sha256>;

/// Prefix of read-write store tokens, `blob_rw_<store_id>_<secret>`
pub const STORE_TOKEN_PREFIX: &str = "blob_rw_";

/// Prefix of minted client tokens, `blob_client_<store_id>_<base64 payload>`
pub const CLIENT_TOKEN_PREFIX: &str = "blob_client_";

/// Header carrying the hex HMAC-SHA256 signature of callback bodies
pub const SIGNATURE_HEADER: &str = "x-blob-signature";

/// Provider backed by a hosted blob store.
///
/// All signing is keyed by the configured read-write token, the same key the store uses when
/// signing completion callbacks.
pub struct ManagedProvider {
    store_id: String,
    token: String,
    callback_url: Option<Url>,
}

impl ManagedProvider {
    /// Build a provider from a read-write store token.
    ///
    /// `callback_url` overrides the client-supplied callback in minted grants, for setups
    /// where the store cannot reach the URL the browser sees.
    pub fn new(token: &str, callback_url: Option<Url>) -> Result<Self> {
        let (store_id, _secret) =
            parse_store_token(token).ok_or(StorageError::MalformedStoreToken)?;
        Ok(Self {
            store_id: store_id.to_string(),
            token: token.to_string(),
            callback_url,
        })
    }

    fn sign(&self, payload: &[u8]) -> Result<String> {
        sign_payload(payload, &self.token).ok_or(StorageError::MalformedStoreToken)
    }
}

#[async_trait]
impl StorageProvider for ManagedProvider {
    async fn grant_client_token(&self, grant: &ClientTokenGrant) -> Result<String> {
        let mut grant = grant.clone();
        if let (Some(hook), Some(url)) = (grant.on_upload_completed.as_mut(), &self.callback_url)
        {
            hook.callback_url = url.to_string();
        }

        let grant_json = serde_json::to_string(&grant)
            .map_err(|e| StorageError::GrantEncoding(e.to_string()))?;
        let signature = self.sign(grant_json.as_bytes())?;

        tracing::debug!(
            store_id = %self.store_id,
            pathname = %grant.pathname,
            "Minting client upload token"
        );

        Ok(format!(
            "{CLIENT_TOKEN_PREFIX}{}_{}",
            self.store_id,
            BASE64.encode(format!("{signature}.{grant_json}"))
        ))
    }

    async fn verify_callback(&self, headers: &axum::http::HeaderMap, body: &str) -> Result<()> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(StorageError::MissingSignature)?;

        let expected = self.sign(body.as_bytes())?;
        if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            Ok(())
        } else {
            Err(StorageError::SignatureMismatch)
        }
    }
}

/// Split a read-write store token into `(store_id, secret)`.
///
/// Returns `None` unless the token has the `blob_rw_<store_id>_<secret>` shape with both
/// parts non-empty.
pub fn parse_store_token(token: &str) -> Option<(&str, &str)> {
    let rest = token.strip_prefix(STORE_TOKEN_PREFIX)?;
    let (store_id, secret) = rest.split_once('_')?;
    if store_id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((store_id, secret))
}

/// Hex HMAC-SHA256 of `payload`, keyed by the full store token.
///
/// Both client-token signatures and callback signatures use this keying.
pub fn sign_payload(payload: &[u8], token: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(token.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex_encode(&mac.finalize().into_bytes()))
}

/// A client token unpacked into its parts.
#[derive(Debug)]
pub struct DecodedClientToken {
    pub store_id: String,
    pub signature: String,
    pub grant: ClientTokenGrant,
}

/// Unpack a minted client token without verifying its signature.
pub fn decode_client_token(token: &str) -> Option<DecodedClientToken> {
    let rest = token.strip_prefix(CLIENT_TOKEN_PREFIX)?;
    let (store_id, encoded) = rest.split_once('_')?;
    let payload = String::from_utf8(BASE64.decode(encoded).ok()?).ok()?;
    let (signature, grant_json) = payload.split_once('.')?;
    let grant = serde_json::from_str(grant_json).ok()?;
    Some(DecodedClientToken {
        store_id: store_id.to_string(),
        signature: signature.to_string(),
        grant,
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Constant-time comparison of two byte slices.
///
/// The comparison time depends only on the lengths, not the contents.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UploadCompletionHook;
    use axum::http::HeaderMap;

    const TEST_TOKEN: &str = "blob_rw_store123_supersecret";

    fn provider() -> ManagedProvider {
        ManagedProvider::new(TEST_TOKEN, None).unwrap()
    }

    fn sample_grant() -> ClientTokenGrant {
        ClientTokenGrant {
            pathname: "report.pdf".to_string(),
            on_upload_completed: Some(UploadCompletionHook {
                callback_url: "http://localhost:3001/api/files/upload".to_string(),
                token_payload: Some(r#"{"pathname":"report.pdf"}"#.to_string()),
            }),
            maximum_size_in_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec!["application/pdf".to_string()],
            valid_until: 1_700_000_000_000,
        }
    }

    fn signed_headers(body: &str, token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            sign_payload(body.as_bytes(), token).unwrap().parse().unwrap(),
        );
        headers
    }

    #[test]
    fn test_parse_store_token() {
        assert_eq!(
            parse_store_token(TEST_TOKEN),
            Some(("store123", "supersecret"))
        );
        // Secrets may themselves contain underscores
        assert_eq!(
            parse_store_token("blob_rw_abc_sec_ret"),
            Some(("abc", "sec_ret"))
        );
    }

    #[test]
    fn test_parse_store_token_rejects_malformed() {
        assert_eq!(parse_store_token("whsec_store_secret"), None);
        assert_eq!(parse_store_token("blob_rw_nosecret"), None);
        assert_eq!(parse_store_token("blob_rw__secret"), None);
        assert_eq!(parse_store_token("blob_rw_store_"), None);
        assert_eq!(parse_store_token(""), None);
    }

    #[test]
    fn test_new_rejects_malformed_token() {
        assert!(matches!(
            ManagedProvider::new("not-a-store-token", None),
            Err(StorageError::MalformedStoreToken)
        ));
    }

    #[test]
    fn test_sign_payload_is_deterministic() {
        let first = sign_payload(b"payload", TEST_TOKEN).unwrap();
        let second = sign_payload(b"payload", TEST_TOKEN).unwrap();
        assert_eq!(first, second);
        // 32 HMAC-SHA256 bytes, hex encoded
        assert_eq!(first.len(), 64);
        assert_ne!(first, sign_payload(b"other payload", TEST_TOKEN).unwrap());
    }

    #[tokio::test]
    async fn test_mint_and_decode_client_token() {
        let provider = provider();
        let grant = sample_grant();

        let token = provider.grant_client_token(&grant).await.unwrap();
        assert!(token.starts_with("blob_client_store123_"));

        let decoded = decode_client_token(&token).expect("token should decode");
        assert_eq!(decoded.store_id, "store123");
        assert_eq!(decoded.grant, grant);

        // The embedded signature is the HMAC of the grant JSON
        let grant_json = serde_json::to_string(&grant).unwrap();
        assert_eq!(
            decoded.signature,
            sign_payload(grant_json.as_bytes(), TEST_TOKEN).unwrap()
        );
    }

    #[tokio::test]
    async fn test_callback_url_override() {
        let override_url = Url::parse("https://tunnel.example.com/api/files/upload").unwrap();
        let provider = ManagedProvider::new(TEST_TOKEN, Some(override_url)).unwrap();

        let token = provider.grant_client_token(&sample_grant()).await.unwrap();
        let decoded = decode_client_token(&token).unwrap();
        assert_eq!(
            decoded.grant.on_upload_completed.unwrap().callback_url,
            "https://tunnel.example.com/api/files/upload"
        );
    }

    #[tokio::test]
    async fn test_verify_callback_accepts_signed_body() {
        let provider = provider();
        let body = r#"{"type":"blob.upload-completed","payload":{}}"#;

        let headers = signed_headers(body, TEST_TOKEN);
        assert!(provider.verify_callback(&headers, body).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_callback_rejects_tampered_body() {
        let provider = provider();
        let body = r#"{"type":"blob.upload-completed","payload":{}}"#;

        let headers = signed_headers(body, TEST_TOKEN);
        let result = provider.verify_callback(&headers, "tampered").await;
        assert!(matches!(result, Err(StorageError::SignatureMismatch)));
    }

    #[tokio::test]
    async fn test_verify_callback_rejects_missing_header() {
        let provider = provider();
        let result = provider.verify_callback(&HeaderMap::new(), "body").await;
        assert!(matches!(result, Err(StorageError::MissingSignature)));
    }

    #[tokio::test]
    async fn test_verify_callback_rejects_foreign_signature() {
        let provider = provider();
        let body = "same body";

        let headers = signed_headers(body, "blob_rw_store123_differentsecret");
        let result = provider.verify_callback(&headers, body).await;
        assert!(matches!(result, Err(StorageError::SignatureMismatch)));
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[]), "");
        assert_eq!(hex_encode(&[0x00, 0xff, 0x0a]), "00ff0a");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"same", b"same"));
        assert!(!constant_time_eq(b"same", b"different"));
        assert!(!constant_time_eq(b"same", b"sama"));
        assert!(constant_time_eq(b"", b""));
    }
}
