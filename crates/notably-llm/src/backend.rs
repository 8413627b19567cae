//! Generation backend trait and implementations.
//!
//! This module defines the abstraction layer for text-generation providers
//! and provides a mock implementation for testing.

use async_trait::async_trait;
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, CompletionResponse, ContentBlock, StopReason, Usage};

// ─────────────────────────────────────────────────────────────────────────────
// Streaming Types
// ─────────────────────────────────────────────────────────────────────────────

/// A streaming response from a backend.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send + 'static>>;

/// Events emitted during streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Message started.
    MessageStart { id: String, model: String },
    /// Content block started.
    ContentBlockStart { index: usize },
    /// Delta within a content block.
    ContentBlockDelta { index: usize, delta: ContentDelta },
    /// Content block finished.
    ContentBlockStop { index: usize },
    /// Message finished with final usage stats.
    MessageDelta {
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Message complete.
    MessageStop,
    /// Keep-alive.
    Ping,
    /// Error occurred.
    Error { message: String },
}

/// Delta content in a streaming response.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentDelta {
    /// Text being streamed.
    TextDelta(String),
}

impl StreamEvent {
    /// Returns the text carried by this event, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta(text),
                ..
            } => Some(text),
            _ => None,
        }
    }

    /// Returns true if this is an error event.
    pub fn is_error(&self) -> bool {
        matches!(self, StreamEvent::Error { .. })
    }

    /// Returns true if this is the final event in a message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::MessageStop | StreamEvent::Error { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for text-generation providers.
///
/// Implementations provide the actual connection to a generation service.
/// The service is a black box: it may be slow, and it may fail. Callers
/// decide what to do about either.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Execute a completion request and return the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Execute a completion request and return a stream of events.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<ResponseStream>;

    /// Get the name of this backend.
    fn name(&self) -> &str;
}

/// A backend that can be shared across tasks.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A scripted reply for [`MockBackend`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Reply with this text.
    Text(String),
    /// Fail the request with a backend error carrying this message.
    Error(String),
    /// Start streaming this text, then emit an error event instead of finishing.
    BrokenStream(String),
}

/// A mock backend for testing purposes.
///
/// Returns pre-configured responses in order. Streaming splits the text into
/// several deltas so consumers see more than one fragment.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    responses: Mutex<Vec<MockResponse>>,
    request_log: Mutex<Vec<CompletionRequest>>,
}

impl MockBackend {
    /// Create a new mock backend with the given scripted responses.
    ///
    /// If more requests are made than responses available, an error is returned.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: Mutex::new(responses),
            request_log: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock backend that replies with each text in order.
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|t| MockResponse::Text(t.into()))
                .collect(),
        )
    }

    /// Create a mock backend with a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![MockResponse::Text(text.into())])
    }

    /// Create a mock backend whose first request fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(vec![MockResponse::Error(message.into())])
    }

    /// Get all requests that were made to this backend.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.request_log.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().len()
    }

    fn next_response(&self, request: CompletionRequest) -> Result<MockResponse> {
        self.request_log.lock().push(request);

        let mut responses = self.responses.lock();
        if responses.is_empty() {
            return Err(LlmError::Backend(
                "MockBackend: no more responses available".to_string(),
            ));
        }
        Ok(responses.remove(0))
    }
}

fn text_response(text: String) -> CompletionResponse {
    CompletionResponse::new(
        "mock_msg",
        "mock-model",
        vec![ContentBlock::Text { text }],
        StopReason::EndTurn,
        Usage::new(10, 20),
    )
}

/// Split text into roughly word-sized fragments, keeping whitespace attached.
fn fragments(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if ch.is_whitespace() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        match self.next_response(request)? {
            MockResponse::Text(text) | MockResponse::BrokenStream(text) => Ok(text_response(text)),
            MockResponse::Error(message) => Err(LlmError::Backend(message)),
        }
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ResponseStream> {
        let (text, broken) = match self.next_response(request)? {
            MockResponse::Text(text) => (text, false),
            MockResponse::BrokenStream(text) => (text, true),
            MockResponse::Error(message) => return Err(LlmError::Backend(message)),
        };

        let mut events = vec![
            Ok(StreamEvent::MessageStart {
                id: "mock_msg".to_string(),
                model: "mock-model".to_string(),
            }),
            Ok(StreamEvent::ContentBlockStart { index: 0 }),
        ];
        for fragment in fragments(&text) {
            events.push(Ok(StreamEvent::ContentBlockDelta {
                index: 0,
                delta: ContentDelta::TextDelta(fragment),
            }));
        }
        if broken {
            events.push(Ok(StreamEvent::Error {
                message: "MockBackend: stream interrupted".to_string(),
            }));
        } else {
            events.push(Ok(StreamEvent::ContentBlockStop { index: 0 }));
            events.push(Ok(StreamEvent::MessageDelta {
                stop_reason: StopReason::EndTurn,
                usage: Usage::new(10, 20),
            }));
            events.push(Ok(StreamEvent::MessageStop));
        }

        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_mock_backend_single_response() {
        let backend = MockBackend::with_text("Hello!");

        let request = CompletionRequest::new("test-model", vec![Message::user("Hi")], 100);
        let response = backend.complete(request).await.unwrap();

        assert_eq!(response.text(), "Hello!");
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_multiple_responses() {
        let backend = MockBackend::with_texts(["First", "Second"]);

        let r1 = backend
            .complete(CompletionRequest::new("m", vec![Message::user("1")], 100))
            .await
            .unwrap();
        let r2 = backend
            .complete(CompletionRequest::new("m", vec![Message::user("2")], 100))
            .await
            .unwrap();

        assert_eq!(r1.text(), "First");
        assert_eq!(r2.text(), "Second");
        assert_eq!(backend.request_count(), 2);
        assert_eq!(backend.requests()[1].messages[0].content.to_text(), "2");
    }

    #[tokio::test]
    async fn test_mock_backend_exhausted() {
        let backend = MockBackend::new(vec![]);

        let request = CompletionRequest::new("test-model", vec![Message::user("Hi")], 100);
        assert!(backend.complete(request).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_backend_failing() {
        let backend = MockBackend::failing("boom");
        let request = CompletionRequest::new("m", vec![Message::user("Hi")], 100);
        let err = backend.complete(request).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_mock_backend_stream_fragments() {
        let backend = MockBackend::with_text("one two three");

        let request = CompletionRequest::new("m", vec![Message::user("Hi")], 100);
        let mut stream = backend.complete_stream(request).await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.unwrap());
        }

        let text: String = events.iter().filter_map(|e| e.text()).collect();
        assert_eq!(text, "one two three");
        assert_eq!(events.iter().filter(|e| e.text().is_some()).count(), 3);
        assert!(matches!(events[0], StreamEvent::MessageStart { .. }));
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_mock_backend_broken_stream_ends_in_error() {
        let backend = MockBackend::new(vec![MockResponse::BrokenStream("partial".into())]);
        let request = CompletionRequest::new("m", vec![Message::user("Hi")], 100);
        let events: Vec<_> = backend
            .complete_stream(request)
            .await
            .unwrap()
            .collect()
            .await;

        let last = events.last().unwrap().as_ref().unwrap();
        assert!(last.is_error());
        assert!(last.is_terminal());
    }

    #[test]
    fn test_stream_event_helpers() {
        assert!(
            StreamEvent::Error {
                message: "oops".to_string()
            }
            .is_error()
        );
        assert!(!StreamEvent::Ping.is_error());
        assert!(StreamEvent::MessageStop.is_terminal());
        assert!(!StreamEvent::ContentBlockStop { index: 0 }.is_terminal());
        assert_eq!(StreamEvent::Ping.text(), None);
    }

    #[test]
    fn test_fragments_keep_whitespace() {
        assert_eq!(fragments("a b\nc"), vec!["a ", "b\n", "c"]);
        assert!(fragments("").is_empty());
    }
}
