//! Turning a picked source file into plain text.
//!
//! Images go through the generation service with an extraction prompt,
//! `text/plain` is decoded directly, and anything else is used as text when
//! it happens to be valid UTF-8.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use notably_llm::{Message, TextGenerator};
use tracing::{debug, warn};
use url::Url;

use crate::error::{DomainError, Result};
use crate::prompts::IMAGE_EXTRACTION_PROMPT;

/// MIME type assumed when none was recorded.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

// ============================================================================
// SourceFetcher
// ============================================================================

/// Reads the raw bytes behind a source handle.
#[async_trait]
pub trait SourceFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>>;
}

pub type SharedFetcher = Arc<dyn SourceFetcher>;

/// Fetches `file:` URIs, plain filesystem paths, and `data:` URIs.
#[derive(Debug, Clone, Default)]
pub struct LocalSourceFetcher;

impl LocalSourceFetcher {
    fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
        let err = |message: &str| DomainError::Extraction {
            uri: abbreviate(uri),
            message: message.to_string(),
        };

        let rest = uri.strip_prefix("data:").ok_or_else(|| err("not a data URI"))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| err("data URI has no payload"))?;
        let payload = urlencoding::decode_binary(payload.as_bytes());
        if meta.ends_with(";base64") {
            let compact: Vec<u8> = payload
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(compact)
                .map_err(|e| err(&format!("invalid base64: {}", e)))
        } else {
            Ok(payload.into_owned())
        }
    }

    /// Resolve a `file:` URI or a plain path to a filesystem path.
    fn to_path(uri: &str) -> Result<PathBuf> {
        let err = |message: &str| DomainError::Extraction {
            uri: uri.to_string(),
            message: message.to_string(),
        };

        match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|()| err("not a local file URI")),
            // `C:\notes.txt` parses with a one-letter scheme
            Ok(url) if url.scheme().len() > 1 => {
                Err(err(&format!("unsupported URI scheme: {}", url.scheme())))
            }
            _ => Ok(PathBuf::from(uri)),
        }
    }
}

#[async_trait]
impl SourceFetcher for LocalSourceFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        if uri.starts_with("data:") {
            return Self::decode_data_uri(uri);
        }

        let path = Self::to_path(uri)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| DomainError::Extraction {
                uri: uri.to_string(),
                message: e.to_string(),
            })
    }
}

/// Keep data URIs out of error messages and logs.
fn abbreviate(uri: &str) -> String {
    match uri.split_once(',') {
        Some((meta, _)) if uri.starts_with("data:") => format!("{},...", meta),
        _ => uri.to_string(),
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// How a source is turned into text, decided by MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionKind {
    Image,
    PlainText,
    Other,
}

impl ExtractionKind {
    pub fn for_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            ExtractionKind::Image
        } else if mime == "text/plain" || mime.starts_with("text/plain;") {
            ExtractionKind::PlainText
        } else {
            ExtractionKind::Other
        }
    }
}

/// Text placed in a note when a source cannot be read as text.
pub fn unsupported_placeholder(file_name: &str, mime: &str) -> String {
    format!(
        "[Text could not be extracted from {} ({}). Only images and text files are fully supported.]",
        file_name, mime
    )
}

/// MIME type of `bytes`, from their magic bytes when they have any.
///
/// Text formats carry no signature, so those keep the recorded type.
pub fn content_type<'a>(bytes: &[u8], recorded: &'a str) -> &'a str {
    match infer::get(bytes) {
        Some(kind) => kind.mime_type(),
        None => recorded,
    }
}

/// Source extraction pipeline.
#[derive(Debug, Clone)]
pub struct Extractor {
    fetcher: SharedFetcher,
    generator: TextGenerator,
}

impl Extractor {
    pub fn new(fetcher: SharedFetcher, generator: TextGenerator) -> Self {
        Self { fetcher, generator }
    }

    /// Extract text from the source at `uri`.
    pub async fn extract(&self, uri: &str, mime: Option<&str>, file_name: &str) -> Result<String> {
        let recorded = mime.filter(|m| !m.trim().is_empty()).unwrap_or(DEFAULT_MIME_TYPE);
        let bytes = self.fetcher.fetch(uri).await?;
        let mime = content_type(&bytes, recorded);
        if mime != recorded {
            debug!(file = file_name, recorded, detected = mime, "Content type differs from recorded");
        }
        let kind = ExtractionKind::for_mime(mime);
        debug!(file = file_name, mime, ?kind, bytes = bytes.len(), "Fetched source");

        match kind {
            ExtractionKind::Image => {
                let encoded = STANDARD.encode(&bytes);
                let message = Message::user_with_image(IMAGE_EXTRACTION_PROMPT, mime, encoded);
                self.generator
                    .generate(vec![message])
                    .await
                    .map_err(DomainError::Generation)
            }
            ExtractionKind::PlainText => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            ExtractionKind::Other => match String::from_utf8(bytes) {
                Ok(text) => Ok(text),
                Err(_) => {
                    warn!(
                        file = file_name,
                        mime, "Source is not text, substituting a placeholder"
                    );
                    Ok(unsupported_placeholder(file_name, mime))
                }
            },
        }
    }
}
