//! OpenAI-compatible hosted model client
//!
//! Drives any endpoint speaking the OpenAI wire format, which covers both configured
//! providers (OpenAI itself and Google's compatibility endpoint). Chat completions are
//! requested with `stream: true` and decoded incrementally from the SSE response body.

use async_openai::types::chat::CreateChatCompletionStreamResponse;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{future, stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::ProviderEndpoint;

use super::{
    ChatMessage, GeneratedImage, ImageModel, LanguageModel, ProviderError, Result, StreamPart,
};

/// A provider endpoint plus the HTTP client used to reach it.
#[derive(Debug, Clone)]
struct ApiEndpoint {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiEndpoint {
    fn from_config(config: &ProviderEndpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.post(format!("{}/{path}", self.base_url));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request
    }
}

/// Chat model served over an OpenAI-compatible chat completions endpoint.
pub struct HostedChatModel {
    endpoint: ApiEndpoint,
    model_id: String,
}

impl HostedChatModel {
    pub fn new(endpoint: &ProviderEndpoint, model_id: impl Into<String>) -> Self {
        Self {
            endpoint: ApiEndpoint::from_config(endpoint),
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for HostedChatModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<BoxStream<'static, Result<StreamPart>>> {
        let body = json!({
            "model": self.model_id,
            "messages": messages,
            "stream": true,
        });

        let response = self.endpoint.post("chat/completions").json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(model = %self.model_id, "Chat completion stream opened");

        let parts = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ProviderError::from))
            .scan(Vec::new(), |buffer, chunk| {
                let parts = match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);
                        drain_sse_lines(buffer)
                    }
                    Err(e) => vec![Err(e)],
                };
                future::ready(Some(stream::iter(parts)))
            })
            .flatten();

        Ok(parts.boxed())
    }
}

/// Image model served over an OpenAI-compatible image generations endpoint.
pub struct HostedImageModel {
    endpoint: ApiEndpoint,
    model_id: String,
}

impl HostedImageModel {
    pub fn new(endpoint: &ProviderEndpoint, model_id: impl Into<String>) -> Self {
        Self {
            endpoint: ApiEndpoint::from_config(endpoint),
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl ImageModel for HostedImageModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let body = json!({
            "model": self.model_id,
            "prompt": prompt,
            "n": 1,
            "response_format": "b64_json",
        });

        let response = self
            .endpoint
            .post("images/generations")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let images: ImagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let image = images.data.into_iter().next().ok_or_else(|| {
            ProviderError::Decode("images response contained no data".to_string())
        })?;

        Ok(GeneratedImage {
            base64: image.b64_json,
            mime_type: "image/png".to_string(),
        })
    }
}

/// Subset of the images API response we consume
#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: String,
}

/// Pull every complete line out of `buffer` and decode its SSE data fields.
///
/// An incomplete trailing line stays buffered until the next network chunk arrives, so data
/// fields split across chunks reassemble correctly. The buffer holds raw bytes and a line is
/// only decoded as UTF-8 once its newline lands, which keeps multi-byte characters split
/// across chunk boundaries intact.
fn drain_sse_lines(buffer: &mut Vec<u8>) -> Vec<Result<StreamPart>> {
    let mut parts = Vec::new();
    while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline).collect();
        let line = String::from_utf8_lossy(&line);
        if let Some(part) = decode_sse_line(line.trim()) {
            parts.push(part);
        }
    }
    parts
}

/// Decode one SSE line into a stream part.
///
/// Handles both `data: value` and `data:value` framing. Returns `None` for non-data lines,
/// the `[DONE]` marker and chunks carrying no content delta.
fn decode_sse_line(line: &str) -> Option<Result<StreamPart>> {
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);

    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<CreateChatCompletionStreamResponse>(data) {
        Ok(chunk) => chunk
            .choices
            .first()
            .and_then(|choice| choice.delta.content.clone())
            .filter(|content| !content.is_empty())
            .map(|content| Ok(StreamPart::Text(content))),
        Err(e) => Some(Err(ProviderError::Decode(format!("bad stream chunk: {e}")))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint_for(server: &MockServer) -> ProviderEndpoint {
        crate::test_utils::install_crypto_provider();
        ProviderEndpoint {
            base_url: Url::parse(&server.uri()).unwrap(),
            api_key: Some("test-key".to_string()),
        }
    }

    fn chunk_json(content: &str) -> String {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": "gemini-2.0-flash-001",
            "choices": [{"index": 0, "delta": {"content": content}}]
        })
        .to_string()
    }

    fn user_message(content: &str) -> Vec<ChatMessage> {
        vec![ChatMessage {
            role: "user".to_string(),
            content: content.to_string(),
        }]
    }

    #[test_log::test(tokio::test)]
    async fn test_stream_chat_collects_deltas() {
        let server = MockServer::start().await;

        // Role-only first chunk carries no content and should not surface
        let role_chunk = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": "gemini-2.0-flash-001",
            "choices": [{"index": 0, "delta": {"role": "assistant"}}]
        });
        let body = format!(
            "data: {role_chunk}\n\ndata: {}\n\ndata: {}\n\ndata: [DONE]\n\n",
            chunk_json("Hello"),
            chunk_json(" world")
        );

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let model = HostedChatModel::new(&endpoint_for(&server), "gemini-2.0-flash-001");
        let parts: Vec<_> = model
            .stream_chat(user_message("hi"))
            .await
            .unwrap()
            .collect()
            .await;

        let parts: Vec<StreamPart> = parts.into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(
            parts,
            vec![
                StreamPart::Text("Hello".to_string()),
                StreamPart::Text(" world".to_string()),
            ]
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_stream_chat_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let model = HostedChatModel::new(&endpoint_for(&server), "gemini-2.0-flash-001");
        let result = model.stream_chat(user_message("hi")).await;

        match result {
            Err(ProviderError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            Err(other) => panic!("Expected ProviderError::Api, got {other:?}"),
            Ok(_) => panic!("Expected ProviderError::Api, got a stream"),
        }
    }

    #[test]
    fn test_drain_sse_lines_reassembles_split_data_field() {
        let full = format!("data: {}\n", chunk_json("split"));
        let (first_half, second_half) = full.split_at(full.len() / 2);

        let mut buffer = Vec::new();

        buffer.extend_from_slice(first_half.as_bytes());
        assert!(drain_sse_lines(&mut buffer).is_empty());
        assert_eq!(buffer, first_half.as_bytes());

        buffer.extend_from_slice(second_half.as_bytes());
        let parts = drain_sse_lines(&mut buffer);
        assert_eq!(parts.len(), 1);
        assert_eq!(
            parts[0].as_ref().unwrap(),
            &StreamPart::Text("split".to_string())
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_sse_lines_keeps_multibyte_characters_split_across_chunks() {
        let full = format!("data: {}\n", chunk_json("héllo"));
        let bytes = full.as_bytes();
        // Cut between the two bytes of 'é'
        let cut = full.find('é').unwrap() + 1;

        let mut buffer = Vec::new();

        buffer.extend_from_slice(&bytes[..cut]);
        assert!(drain_sse_lines(&mut buffer).is_empty());

        buffer.extend_from_slice(&bytes[cut..]);
        let parts = drain_sse_lines(&mut buffer);
        assert_eq!(parts.len(), 1);
        assert_eq!(
            parts[0].as_ref().unwrap(),
            &StreamPart::Text("héllo".to_string())
        );
    }

    #[test]
    fn test_decode_sse_line() {
        assert!(decode_sse_line("").is_none());
        assert!(decode_sse_line(": keep-alive comment").is_none());
        assert!(decode_sse_line("data:").is_none());
        assert!(decode_sse_line("data: [DONE]").is_none());

        // Unparseable data fields surface as decode errors instead of vanishing
        let error = decode_sse_line("data: not json").unwrap();
        assert!(matches!(error, Err(ProviderError::Decode(_))));

        let part = decode_sse_line(&format!("data:{}", chunk_json("hi"))).unwrap();
        assert_eq!(part.unwrap(), StreamPart::Text("hi".to_string()));
    }

    #[test_log::test(tokio::test)]
    async fn test_generate_image() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(
                json!({"model": "dall-e-2", "prompt": "a lighthouse", "response_format": "b64_json"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": 1_700_000_000,
                "data": [{"b64_json": "aGVsbG8="}]
            })))
            .mount(&server)
            .await;

        let model = HostedImageModel::new(&endpoint_for(&server), "dall-e-2");
        let image = model.generate_image("a lighthouse").await.unwrap();

        assert_eq!(image.base64, "aGVsbG8=");
        assert_eq!(image.mime_type, "image/png");
    }

    #[test_log::test(tokio::test)]
    async fn test_generate_image_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"created": 1_700_000_000, "data": []})),
            )
            .mount(&server)
            .await;

        let model = HostedImageModel::new(&endpoint_for(&server), "dall-e-3");
        let result = model.generate_image("a lighthouse").await;

        assert!(matches!(result, Err(ProviderError::Decode(_))));
    }
}
