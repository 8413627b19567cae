//! Note data model and its persisted projection.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters of `content` written to storage per note.
pub const DEFAULT_CONTENT_LIMIT: usize = 5000;

/// Title shown until generation produces a real one.
pub const PLACEHOLDER_TITLE: &str = "Generating...";

/// Structural style requested for a note's generated summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteFormat {
    #[default]
    Paragraph,
    BulletPoints,
    Outline,
}

impl NoteFormat {
    pub const ALL: [NoteFormat; 3] = [
        NoteFormat::Paragraph,
        NoteFormat::BulletPoints,
        NoteFormat::Outline,
    ];

    /// Wire name (`paragraph`, `bullet-points`, `outline`).
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteFormat::Paragraph => "paragraph",
            NoteFormat::BulletPoints => "bullet-points",
            NoteFormat::Outline => "outline",
        }
    }

    /// Human-readable badge label.
    pub fn label(&self) -> &'static str {
        match self {
            NoteFormat::Paragraph => "Paragraph",
            NoteFormat::BulletPoints => "Bullet Points",
            NoteFormat::Outline => "Outline",
        }
    }
}

impl fmt::Display for NoteFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paragraph" | "paragraphs" => Ok(NoteFormat::Paragraph),
            "bullet-points" | "bullets" | "bullet_points" => Ok(NoteFormat::BulletPoints),
            "outline" => Ok(NoteFormat::Outline),
            other => Err(format!(
                "unknown format '{}' (expected paragraph, bullet-points, or outline)",
                other
            )),
        }
    }
}

/// How the source was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Document,
    Photo,
    Image,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Document => "document",
            SourceType::Photo => "photo",
            SourceType::Image => "image",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A note: one uploaded source and its generated summary.
///
/// `summary == ""` means generation has not completed yet. `file_uri` is a
/// transient handle to the picked file and only lives in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub format: NoteFormat,
    pub source_file_name: String,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl Note {
    /// True while the summary is still the empty sentinel.
    pub fn is_awaiting_generation(&self) -> bool {
        self.summary.is_empty()
    }

    /// True when a transient source handle is attached.
    pub fn has_source(&self) -> bool {
        self.file_uri.as_deref().is_some_and(|uri| !uri.is_empty())
    }

    /// Shallow-merge the fields present in `update`.
    ///
    /// A non-empty summary is never replaced by an empty one. Returns whether
    /// anything changed.
    pub fn apply(&mut self, update: NoteUpdate) -> bool {
        let mut changed = false;

        if let Some(title) = update.title {
            changed |= replace(&mut self.title, title);
        }
        if let Some(content) = update.content {
            changed |= replace(&mut self.content, content);
        }
        if let Some(summary) = update.summary
            && !(summary.is_empty() && !self.summary.is_empty())
        {
            changed |= replace(&mut self.summary, summary);
        }
        if let Some(uri) = update.file_uri {
            changed |= replace(&mut self.file_uri, Some(uri));
        }
        if let Some(mime) = update.file_mime_type {
            changed |= replace(&mut self.file_mime_type, Some(mime));
        }
        if let Some(instructions) = update.custom_instructions {
            changed |= replace(&mut self.custom_instructions, Some(instructions));
        }

        changed
    }

    /// Text handed to a share sheet or clipboard.
    pub fn share_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.summary)
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Partial set of note fields for [`NoteStore::update_note`](crate::NoteStore::update_note).
///
/// Identity and provenance (`id`, `format`, `source_*`, `created_at`) are not
/// updatable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub file_uri: Option<String>,
    pub file_mime_type: Option<String>,
    pub custom_instructions: Option<String>,
}

impl NoteUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn file_uri(mut self, uri: impl Into<String>) -> Self {
        self.file_uri = Some(uri.into());
        self
    }

    pub fn file_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.file_mime_type = Some(mime.into());
        self
    }

    pub fn custom_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.custom_instructions = Some(instructions.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The stored form of a note: no `fileUri`, `content` cut to the limit.
///
/// Unknown fields (including a `fileUri` written by older versions) are
/// ignored when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedNote {
    pub id: String,
    pub title: String,
    pub content: String,
    pub format: NoteFormat,
    pub source_file_name: String,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl PersistedNote {
    pub fn project(note: &Note, content_limit: usize) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            content: truncate_chars(&note.content, content_limit).into_owned(),
            format: note.format,
            source_file_name: note.source_file_name.clone(),
            source_type: note.source_type,
            created_at: note.created_at,
            summary: note.summary.clone(),
            file_mime_type: note.file_mime_type.clone(),
            custom_instructions: note.custom_instructions.clone(),
        }
    }
}

impl From<PersistedNote> for Note {
    fn from(p: PersistedNote) -> Self {
        Note {
            id: p.id,
            title: p.title,
            content: p.content,
            format: p.format,
            source_file_name: p.source_file_name,
            source_type: p.source_type,
            created_at: p.created_at,
            summary: p.summary,
            file_uri: None,
            file_mime_type: p.file_mime_type,
            custom_instructions: p.custom_instructions,
        }
    }
}

/// First `limit` characters of `s` (Unicode scalar values, never splitting one).
pub fn truncate_chars(s: &str, limit: usize) -> Cow<'_, str> {
    match s.char_indices().nth(limit) {
        Some((byte_idx, _)) => Cow::Owned(s[..byte_idx].to_string()),
        None => Cow::Borrowed(s),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sample_note(id: &str) -> Note {
        Note {
            id: id.to_string(),
            title: PLACEHOLDER_TITLE.to_string(),
            content: String::new(),
            format: NoteFormat::Paragraph,
            source_file_name: "lecture.txt".to_string(),
            source_type: SourceType::Document,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            summary: String::new(),
            file_uri: Some(format!("file:///tmp/{id}.txt")),
            file_mime_type: Some("text/plain".to_string()),
            custom_instructions: None,
        }
    }

    #[test]
    fn test_format_wire_names() {
        assert_eq!(
            serde_json::to_string(&NoteFormat::BulletPoints).unwrap(),
            "\"bullet-points\""
        );
        for format in NoteFormat::ALL {
            assert_eq!(format.as_str().parse::<NoteFormat>().unwrap(), format);
        }
        assert_eq!(NoteFormat::Outline.label(), "Outline");
        assert!("poem".parse::<NoteFormat>().is_err());
    }

    #[test]
    fn test_truncate_chars_boundary() {
        let exact = "a".repeat(5000);
        assert_eq!(truncate_chars(&exact, 5000), exact);
        assert!(matches!(truncate_chars(&exact, 5000), Cow::Borrowed(_)));

        let over = "a".repeat(5001);
        assert_eq!(truncate_chars(&over, 5000).chars().count(), 5000);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let s = "héllo wörld";
        assert_eq!(truncate_chars(s, 4), "héll");
        assert_eq!(truncate_chars(s, 0), "");
    }

    #[test]
    fn test_apply_is_shallow() {
        let mut note = sample_note("1");
        assert!(note.apply(NoteUpdate::new().summary("Y")));
        assert_eq!(note.summary, "Y");
        assert_eq!(note.title, PLACEHOLDER_TITLE);

        assert!(note.apply(NoteUpdate::new().title("X")));
        assert_eq!(note.title, "X");
        assert_eq!(note.summary, "Y");

        assert!(!note.apply(NoteUpdate::new().title("X")));
    }

    #[test]
    fn test_apply_never_clears_summary() {
        let mut note = sample_note("1");
        note.apply(NoteUpdate::new().summary("done"));
        assert!(!note.apply(NoteUpdate::new().summary("")));
        assert_eq!(note.summary, "done");
        assert!(!note.is_awaiting_generation());
    }

    #[test]
    fn test_projection_drops_file_uri_and_truncates() {
        let mut note = sample_note("1");
        note.content = "x".repeat(6000);
        let projected = PersistedNote::project(&note, DEFAULT_CONTENT_LIMIT);
        assert_eq!(projected.content.len(), DEFAULT_CONTENT_LIMIT);

        let json = serde_json::to_value(&projected).unwrap();
        assert!(json.get("fileUri").is_none());
        assert_eq!(json["sourceFileName"], "lecture.txt");
        assert_eq!(json["sourceType"], "document");
        assert_eq!(json["fileMimeType"], "text/plain");
        assert!(json.get("customInstructions").is_none());
    }

    #[test]
    fn test_persisted_note_ignores_legacy_file_uri() {
        let json = r#"{
            "id": "1700000000000",
            "title": "Biology",
            "content": "cells",
            "format": "outline",
            "sourceFileName": "bio.jpg",
            "sourceType": "photo",
            "createdAt": "2024-11-14T22:13:20.000Z",
            "summary": "1. Cells",
            "fileUri": "data:image/jpeg;base64,AAAA",
            "fileMimeType": "image/jpeg",
            "customInstructions": ""
        }"#;
        let note: Note = serde_json::from_str::<PersistedNote>(json).unwrap().into();
        assert_eq!(note.format, NoteFormat::Outline);
        assert_eq!(note.source_type, SourceType::Photo);
        assert_eq!(note.file_uri, None);
        assert_eq!(note.custom_instructions.as_deref(), Some(""));
    }

    #[test]
    fn test_share_text() {
        let mut note = sample_note("1");
        note.apply(NoteUpdate::new().title("T").summary("S"));
        assert_eq!(note.share_text(), "T\n\nS");
    }
}
