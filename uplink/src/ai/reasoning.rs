//! Reasoning extraction for thinking models
//!
//! Thinking models emit their chain of thought inline, wrapped in a tag pair such as
//! `<think>...</think>`. `ExtractReasoning` wraps a `LanguageModel` and splits that inline
//! markup into `StreamPart::Reasoning` and `StreamPart::Text` parts as the stream arrives,
//! including when a tag straddles two network chunks.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{future, stream, StreamExt};

use super::providers::{ChatMessage, LanguageModel, Result, StreamPart};

/// Wrapper that lifts inline `<tag>...</tag>` sections out of a model's text stream.
pub struct ExtractReasoning<M> {
    inner: M,
    tag: String,
}

impl<M> ExtractReasoning<M> {
    pub fn new(inner: M, tag: &str) -> Self {
        Self {
            inner,
            tag: tag.to_string(),
        }
    }
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for ExtractReasoning<M> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<BoxStream<'static, Result<StreamPart>>> {
        let inner = self.inner.stream_chat(messages).await?;
        Ok(extract_reasoning(inner, &self.tag))
    }
}

/// Re-classify the text parts of `parts` according to `<tag>...</tag>` markers.
///
/// Errors and already-classified parts pass through untouched. Anything still buffered when
/// the stream ends is flushed in the phase the scanner was left in, so an unterminated
/// reasoning section is not lost.
pub fn extract_reasoning(
    parts: BoxStream<'static, Result<StreamPart>>,
    tag: &str,
) -> BoxStream<'static, Result<StreamPart>> {
    let scanner = TagScanner::new(tag);

    // A trailing sentinel gives the scanner one last call to flush after the inner stream ends
    parts
        .map(Some)
        .chain(stream::once(future::ready(None)))
        .scan(scanner, |scanner, item| {
            let parts: Vec<Result<StreamPart>> = match item {
                Some(Ok(StreamPart::Text(text))) => {
                    scanner.push(&text).into_iter().map(Ok).collect()
                }
                Some(Ok(part)) => vec![Ok(part)],
                Some(Err(e)) => vec![Err(e)],
                None => scanner.finish().into_iter().map(Ok).collect(),
            };
            future::ready(Some(stream::iter(parts)))
        })
        .flatten()
        .boxed()
}

/// Incremental scanner for one tag pair.
///
/// Text is emitted as soon as it can no longer be part of a tag, so at most `tag.len() - 1`
/// bytes are ever held back between deltas.
struct TagScanner {
    open_tag: String,
    close_tag: String,
    buffer: String,
    in_reasoning: bool,
}

impl TagScanner {
    fn new(tag: &str) -> Self {
        Self {
            open_tag: format!("<{tag}>"),
            close_tag: format!("</{tag}>"),
            buffer: String::new(),
            in_reasoning: false,
        }
    }

    /// Feed a text delta, returning the parts that became unambiguous.
    fn push(&mut self, text: &str) -> Vec<StreamPart> {
        self.buffer.push_str(text);
        let mut parts = Vec::new();

        loop {
            let tag = if self.in_reasoning {
                &self.close_tag
            } else {
                &self.open_tag
            };

            match self.buffer.find(tag.as_str()) {
                Some(index) => {
                    let before: String = self.buffer.drain(..index).collect();
                    self.emit(&mut parts, before);
                    self.buffer.drain(..tag.len());
                    self.in_reasoning = !self.in_reasoning;
                }
                None => {
                    // Hold back any suffix that could still grow into the tag
                    let keep = partial_suffix_len(&self.buffer, &tag);
                    let ready: String = self.buffer.drain(..self.buffer.len() - keep).collect();
                    self.emit(&mut parts, ready);
                    break;
                }
            }
        }

        parts
    }

    /// Flush whatever is still buffered once the stream ends.
    fn finish(&mut self) -> Option<StreamPart> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(if self.in_reasoning {
            StreamPart::Reasoning(rest)
        } else {
            StreamPart::Text(rest)
        })
    }

    fn emit(&self, parts: &mut Vec<StreamPart>, text: String) {
        if text.is_empty() {
            return;
        }
        parts.push(if self.in_reasoning {
            StreamPart::Reasoning(text)
        } else {
            StreamPart::Text(text)
        });
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `tag`.
fn partial_suffix_len(text: &str, tag: &str) -> usize {
    let max = tag.len().saturating_sub(1).min(text.len());
    for len in (1..=max).rev() {
        if !text.is_char_boundary(text.len() - len) {
            continue;
        }
        if tag.starts_with(&text[text.len() - len..]) {
            return len;
        }
    }
    0
}
