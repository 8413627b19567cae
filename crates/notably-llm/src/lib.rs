//! Text-generation client abstraction for Notably.
//!
//! The generation service is treated as a black box: text (optionally with
//! an image) goes in, text comes out, either whole or as a stream of
//! fragments.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  TextGenerator (model + token budget)   │
//! │  - generate() -> String                 │
//! │  - stream()   -> Stream<TextChunk>      │
//! └─────────────────────────────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!   ┌────────────┐      ┌─────────────┐
//!   │ Anthropic  │      │ MockBackend │
//!   └────────────┘      └─────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod generator;
pub mod types;

// Provider implementations
pub mod anthropic;

pub use backend::{
    ContentDelta, LlmBackend, MockBackend, MockResponse, ResponseStream, SharedBackend,
    StreamEvent,
};
pub use error::{LlmError, Result};
pub use generator::{DEFAULT_MAX_TOKENS, TextChunk, TextGenerator, TextStream};
pub use types::{
    CompletionRequest, CompletionResponse, Content, ContentBlock, ImageSource, Message, Role,
    StopReason, Usage,
};

pub use anthropic::{AnthropicBackend, AnthropicConfig};
