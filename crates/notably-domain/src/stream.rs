//! Reducing a generation stream into a single committed text.

use futures::StreamExt;
use notably_llm::{LlmError, StopReason, TextChunk, TextStream};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Append-only buffer over a text stream.
///
/// Every fragment is published to the watch channel so observers can render
/// the partial text. Nothing leaves the accumulator until the producer
/// finishes.
#[derive(Debug)]
pub struct StreamAccumulator<'a> {
    buffer: String,
    partial: &'a watch::Sender<String>,
}

impl<'a> StreamAccumulator<'a> {
    /// Start a fresh buffer, clearing whatever the channel showed before.
    pub fn new(partial: &'a watch::Sender<String>) -> Self {
        partial.send_replace(String::new());
        Self {
            buffer: String::new(),
            partial,
        }
    }

    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.buffer.push_str(fragment);
        self.partial.send_replace(self.buffer.clone());
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Take the finished text.
    pub fn finish(self) -> String {
        self.buffer
    }

    /// Throw the partial text away and clear the channel.
    pub fn discard(self) {
        self.partial.send_replace(String::new());
    }

    /// Drain `stream` into the buffer.
    ///
    /// Returns the full text once the producer signals completion or the
    /// stream ends cleanly. On a stream error the buffer is discarded. Blank
    /// output is reported as [`LlmError::EmptyResponse`].
    pub async fn collect(mut self, mut stream: TextStream) -> Result<String, LlmError> {
        let mut completed = false;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(TextChunk::Delta(fragment)) => self.push(&fragment),
                Ok(TextChunk::Done { stop_reason }) => {
                    if stop_reason == StopReason::MaxTokens {
                        warn!(chars = self.buffer.chars().count(), "Generation hit the token limit");
                    }
                    completed = true;
                    break;
                }
                Err(e) => {
                    self.discard();
                    return Err(e);
                }
            }
        }

        if !completed {
            debug!("Stream ended without a completion marker");
        }
        if self.buffer.trim().is_empty() {
            self.discard();
            return Err(LlmError::EmptyResponse);
        }
        Ok(self.finish())
    }
}
