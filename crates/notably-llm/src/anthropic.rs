//! Anthropic API backend implementation.
//!
//! This module provides the `AnthropicBackend` which connects to Anthropic's
//! Messages API, including the server-sent-event stream used for
//! incremental summaries.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, header};
use std::pin::Pin;
use std::time::Duration;

use crate::backend::{ContentDelta, LlmBackend, ResponseStream, StreamEvent};
use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, CompletionResponse, ContentBlock, Role, StopReason, Usage};

/// Default API base URL.
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Default API version.
const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// API version header.
    pub api_version: String,

    /// Transport timeout for a single request.
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            LlmError::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Anthropic Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend with the given configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create a backend from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::from_env()?)
    }

    /// Build the messages endpoint URL.
    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// Add authentication and API headers to a request.
    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Handle a successful response.
    async fn handle_response(response: Response) -> Result<CompletionResponse> {
        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: ApiResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Serialization(e.to_string()))?;

        Ok(parsed.into())
    }

    /// Handle an error response.
    async fn handle_error_response(response: Response) -> LlmError {
        let status = response.status();

        let retry_after_header = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ApiError>(&body) {
            Ok(error) => match status.as_u16() {
                401 | 403 => {
                    LlmError::Auth(format!("Authentication failed: {}", error.error.message))
                }
                429 => LlmError::rate_limit(error.error.message, retry_after_header.as_deref()),
                400 | 413 => LlmError::InvalidRequest(error.error.message),
                500..=599 => LlmError::Backend(format!("Server error: {}", error.error.message)),
                _ => LlmError::Backend(error.error.message),
            },
            Err(_) => LlmError::Backend(format!("HTTP {}: {}", status, body)),
        }
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let mut request = request;
        request.stream = false;

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .add_headers(self.client.post(self.messages_url()))
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ResponseStream> {
        let mut request = request;
        request.stream = true;

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Opening completion stream"
        );

        let response = self
            .add_headers(self.client.post(self.messages_url()))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        Ok(parse_sse_stream(response.bytes_stream()))
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct ApiResponse {
    id: String,
    content: Vec<ApiContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: ApiUsage,
}

impl From<ApiResponse> for CompletionResponse {
    fn from(api: ApiResponse) -> Self {
        let content = api
            .content
            .into_iter()
            .filter_map(|block| match block {
                ApiContentBlock::Text { text } => Some(ContentBlock::Text { text }),
                ApiContentBlock::Other => None,
            })
            .collect();

        CompletionResponse {
            id: api.id,
            role: Role::Assistant,
            content,
            model: api.model,
            stop_reason: Some(StopReason::from_api(api.stop_reason.as_deref())),
            usage: Usage::new(api.usage.input_tokens, api.usage.output_tokens),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, serde::Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, serde::Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE Stream Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse SSE events from a byte stream and convert to StreamEvents.
fn parse_sse_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
) -> ResponseStream {
    Box::pin(futures::stream::unfold(
        SseState {
            byte_stream: Box::pin(byte_stream),
            buffer: Vec::new(),
            current_event: None,
            done: false,
        },
        |mut state| async move {
            if state.done {
                return None;
            }

            loop {
                while let Some(line_end) = state.buffer.iter().position(|&b| b == b'\n') {
                    let line = String::from_utf8_lossy(&state.buffer[..line_end])
                        .trim()
                        .to_string();
                    state.buffer.drain(..=line_end);

                    if line.is_empty() {
                        // Blank line terminates the current event
                        state.current_event = None;
                        continue;
                    }

                    if let Some((key, value)) = parse_sse_line(&line) {
                        match key {
                            "event" => {
                                state.current_event = Some(value.to_string());
                            }
                            "data" => {
                                if let Some(event_type) = &state.current_event
                                    && let Some(event) = parse_stream_event(event_type, value)
                                {
                                    if event.is_terminal() {
                                        state.done = true;
                                    }
                                    return Some((Ok(event), state));
                                }
                            }
                            _ => {}
                        }
                    }
                }

                match state.byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        state.buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(LlmError::Network(e.to_string())), state));
                    }
                    None => return None,
                }
            }
        },
    ))
}

struct SseState {
    byte_stream: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: Vec<u8>,
    current_event: Option<String>,
    done: bool,
}

fn parse_sse_line(line: &str) -> Option<(&str, &str)> {
    if let Some(value) = line.strip_prefix("event:") {
        Some(("event", value.trim_start()))
    } else if let Some(value) = line.strip_prefix("data:") {
        Some(("data", value.trim_start()))
    } else {
        None
    }
}

fn parse_stream_event(event_type: &str, data: &str) -> Option<StreamEvent> {
    match event_type {
        "message_start" => serde_json::from_str::<MessageStartEvent>(data)
            .ok()
            .map(|parsed| StreamEvent::MessageStart {
                id: parsed.message.id,
                model: parsed.message.model,
            }),
        "content_block_start" => serde_json::from_str::<IndexedEvent>(data)
            .ok()
            .map(|parsed| StreamEvent::ContentBlockStart {
                index: parsed.index,
            }),
        "content_block_delta" => {
            let parsed = serde_json::from_str::<ContentBlockDeltaEvent>(data).ok()?;
            match parsed.delta {
                DeltaContent::TextDelta { text } => Some(StreamEvent::ContentBlockDelta {
                    index: parsed.index,
                    delta: ContentDelta::TextDelta(text),
                }),
                DeltaContent::Other => None,
            }
        }
        "content_block_stop" => serde_json::from_str::<IndexedEvent>(data)
            .ok()
            .map(|parsed| StreamEvent::ContentBlockStop {
                index: parsed.index,
            }),
        "message_delta" => serde_json::from_str::<MessageDeltaEvent>(data)
            .ok()
            .map(|parsed| StreamEvent::MessageDelta {
                stop_reason: StopReason::from_api(parsed.delta.stop_reason.as_deref()),
                usage: Usage::new(0, parsed.usage.output_tokens),
            }),
        "message_stop" => Some(StreamEvent::MessageStop),
        "ping" => Some(StreamEvent::Ping),
        "error" => {
            let message = serde_json::from_str::<ApiError>(data)
                .map(|parsed| parsed.error.message)
                .unwrap_or_else(|_| "Unknown streaming error".to_string());
            Some(StreamEvent::Error { message })
        }
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE Event Structures
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct MessageStartEvent {
    message: MessageStartMessage,
}

#[derive(Debug, serde::Deserialize)]
struct MessageStartMessage {
    id: String,
    model: String,
}

#[derive(Debug, serde::Deserialize)]
struct IndexedEvent {
    index: usize,
}

#[derive(Debug, serde::Deserialize)]
struct ContentBlockDeltaEvent {
    index: usize,
    delta: DeltaContent,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DeltaContent {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, serde::Deserialize)]
struct MessageDeltaEvent {
    delta: MessageDelta,
    usage: MessageDeltaUsage,
}

#[derive(Debug, serde::Deserialize)]
struct MessageDelta {
    stop_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct MessageDeltaUsage {
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = AnthropicConfig::new("test-key");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, DEFAULT_API_BASE);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_config_builders() {
        let config = AnthropicConfig::new("key")
            .with_base_url("http://localhost:8080")
            .with_timeout(Duration::from_secs(60));
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_messages_url() {
        let backend = AnthropicBackend::new(AnthropicConfig::new("key")).unwrap();
        assert_eq!(
            backend.messages_url(),
            "https://api.anthropic.com/v1/messages"
        );

        let backend =
            AnthropicBackend::new(AnthropicConfig::new("key").with_base_url("http://proxy/"))
                .unwrap();
        assert_eq!(backend.messages_url(), "http://proxy/v1/messages");
        assert_eq!(backend.name(), "anthropic");
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(
            parse_sse_line("event: message_start"),
            Some(("event", "message_start"))
        );
        assert_eq!(
            parse_sse_line("data: {\"foo\": 1}"),
            Some(("data", "{\"foo\": 1}"))
        );
        assert_eq!(parse_sse_line(": comment"), None);
    }

    #[test]
    fn test_api_response_conversion_skips_unknown_blocks() {
        let body = r#"{
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Hello!"}
            ],
            "model": "claude-test",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;
        let api: ApiResponse = serde_json::from_str(body).unwrap();
        let response: CompletionResponse = api.into();

        assert_eq!(response.id, "msg_123");
        assert_eq!(response.text(), "Hello!");
        assert_eq!(response.content.len(), 1);
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(response.usage, Usage::new(10, 5));
    }

    #[test]
    fn test_parse_stream_event_text_delta() {
        let event = parse_stream_event(
            "content_block_delta",
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        )
        .unwrap();
        assert_eq!(event.text(), Some("Hi"));
    }

    #[test]
    fn test_parse_stream_event_error() {
        let event = parse_stream_event(
            "error",
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::Error {
                message: "Overloaded".to_string()
            }
        );

        let event = parse_stream_event("error", "not json").unwrap();
        assert!(event.is_error());
    }

    #[tokio::test]
    async fn test_parse_sse_stream_across_chunk_boundaries() {
        let raw = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"m1\",\"model\":\"c\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"lö\"}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        // Split into awkward chunks to exercise buffering.
        let chunks: Vec<reqwest::Result<Bytes>> = raw
            .as_bytes()
            .chunks(17)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        let events: Vec<StreamEvent> = parse_sse_stream(futures::stream::iter(chunks))
            .map(|e| e.unwrap())
            .collect()
            .await;

        let text: String = events.iter().filter_map(|e| e.text()).collect();
        assert_eq!(text, "Hellö");
        assert_eq!(events.last(), Some(&StreamEvent::MessageStop));
    }
}
