//! High-level text generation facade.
//!
//! [`TextGenerator`] binds a backend to a model and token budget and exposes
//! the two shapes callers need: a one-shot `generate` returning the full
//! text, and `stream` returning text fragments followed by an explicit
//! completion marker.
//!
//! ```rust,ignore
//! use notably_llm::{Message, TextGenerator};
//!
//! let generator = TextGenerator::new(backend, "claude-sonnet-4-5", 8192);
//! let title = generator.generate(vec![Message::user("Name this")]).await?;
//! ```

use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::backend::{ContentDelta, SharedBackend, StreamEvent};
use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, Message, StopReason};

/// Default output budget per request.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// One item of a text stream.
#[derive(Debug, Clone, PartialEq)]
pub enum TextChunk {
    /// A fragment of generated text.
    Delta(String),
    /// The producer finished the message.
    Done { stop_reason: StopReason },
}

/// Stream of text fragments. A stream that ends without [`TextChunk::Done`]
/// was cut off.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<TextChunk>> + Send + 'static>>;

/// Backend + model binding used by the rest of the application.
#[derive(Clone)]
pub struct TextGenerator {
    backend: SharedBackend,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for TextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextGenerator")
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl TextGenerator {
    /// Create a generator for the given backend and model.
    pub fn new(backend: SharedBackend, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            backend,
            model: model.into(),
            max_tokens,
        }
    }

    /// The model requests are sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest::new(self.model.clone(), messages, self.max_tokens)
    }

    /// Run a request to completion and return its text.
    ///
    /// Whitespace-only output is reported as [`LlmError::EmptyResponse`].
    pub async fn generate(&self, messages: Vec<Message>) -> Result<String> {
        let response = self.backend.complete(self.request(messages)).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        tracing::debug!(
            backend = self.backend.name(),
            output_tokens = response.usage.output_tokens,
            chars = text.chars().count(),
            "Generation complete"
        );
        Ok(text)
    }

    /// Open a streaming request and reduce provider events to text chunks.
    pub async fn stream(&self, messages: Vec<Message>) -> Result<TextStream> {
        let events = self
            .backend
            .complete_stream(self.request(messages).with_streaming())
            .await?;
        Ok(text_chunks(events))
    }
}

/// Reduce raw stream events to text fragments plus a completion marker.
fn text_chunks(
    events: impl Stream<Item = Result<StreamEvent>> + Send + 'static,
) -> TextStream {
    let chunks = events
        .scan(StopReason::EndTurn, |stop_reason, event| {
            let item = match event {
                Ok(StreamEvent::ContentBlockDelta {
                    delta: ContentDelta::TextDelta(text),
                    ..
                }) => Some(Ok(TextChunk::Delta(text))),
                Ok(StreamEvent::MessageDelta {
                    stop_reason: reason,
                    ..
                }) => {
                    *stop_reason = reason;
                    None
                }
                Ok(StreamEvent::MessageStop) => Some(Ok(TextChunk::Done {
                    stop_reason: *stop_reason,
                })),
                Ok(StreamEvent::Error { message }) => Some(Err(LlmError::Stream(message))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            };
            futures::future::ready(Some(item))
        })
        .filter_map(futures::future::ready);
    Box::pin(chunks)
}
