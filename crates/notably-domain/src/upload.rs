//! Creating draft notes from picked files.

use std::path::Path;

use chrono::Utc;
use notably_store::{Note, NoteFormat, NoteStore, PLACEHOLDER_TITLE, SourceType, next_note_id};
use tracing::{debug, info};
use url::Url;

use crate::error::Result;
use crate::extraction::DEFAULT_MIME_TYPE;

/// What a file or photo picker hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub uri: String,
    pub display_name: String,
    pub mime_type: String,
}

impl PickedFile {
    pub fn new(
        uri: impl Into<String>,
        display_name: impl Into<String>,
        mime_type: Option<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            display_name: display_name.into(),
            mime_type: mime_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
        }
    }

    /// A file on the local filesystem, typed by its magic bytes and then by
    /// its extension. Relative paths are kept as plain paths.
    pub fn from_path(path: &Path) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let sniffed = match infer::get_from_path(path) {
            Ok(kind) => kind.map(|k| k.mime_type()),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Could not read file header");
                None
            }
        };
        let mime = sniffed
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(mime_from_extension)
            })
            .map(str::to_string);
        let uri = Url::from_file_path(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|()| path.display().to_string());
        Self::new(uri, display_name, mime)
    }

    /// A camera capture. Captures are JPEG and named by timestamp.
    pub fn photo(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            display_name: format!("photo_{}.jpg", Utc::now().timestamp_millis()),
            mime_type: "image/jpeg".to_string(),
        }
    }
}

/// MIME type for common source extensions.
pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "txt" | "text" | "log" => Some("text/plain"),
        "md" | "markdown" => Some("text/markdown"),
        "csv" => Some("text/csv"),
        "html" | "htm" => Some("text/html"),
        "json" => Some("application/json"),
        "pdf" => Some("application/pdf"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// Everything the upload form collects besides the file.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub format: NoteFormat,
    pub source_type: Option<SourceType>,
    pub custom_instructions: Option<String>,
}

impl UploadOptions {
    pub fn new(format: NoteFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.custom_instructions = Some(instructions.into());
        self
    }
}

/// Build the draft note for a picked file.
///
/// The draft waits for generation: placeholder title, empty content and
/// summary. Without an explicit source type, images are `image` and
/// everything else `document`.
pub fn draft_note(file: &PickedFile, options: &UploadOptions) -> Note {
    let source_type = options.source_type.unwrap_or_else(|| {
        if file.mime_type.starts_with("image/") {
            SourceType::Image
        } else {
            SourceType::Document
        }
    });

    Note {
        id: next_note_id(),
        title: PLACEHOLDER_TITLE.to_string(),
        content: String::new(),
        format: options.format,
        source_file_name: file.display_name.clone(),
        source_type,
        created_at: Utc::now(),
        summary: String::new(),
        file_uri: Some(file.uri.clone()),
        file_mime_type: Some(file.mime_type.clone()),
        custom_instructions: options
            .custom_instructions
            .clone()
            .filter(|s| !s.trim().is_empty()),
    }
}

/// Add a draft for `picked` to the store. A cancelled pick (`None`) does
/// nothing.
pub fn create_note(
    store: &NoteStore,
    picked: Option<PickedFile>,
    options: &UploadOptions,
) -> Result<Option<Note>> {
    let Some(file) = picked else {
        return Ok(None);
    };

    let note = draft_note(&file, options);
    store.add_note(note.clone())?;
    info!(
        note_id = %note.id,
        file = %note.source_file_name,
        format = %note.format,
        "Draft note created"
    );
    Ok(Some(note))
}
