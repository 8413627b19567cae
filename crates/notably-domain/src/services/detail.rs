//! Note detail controller.
//!
//! Drives one note after it has been created: the first generation pass
//! (extract, title, streamed summary), chat-style revisions, sharing, and
//! deletion. One controller corresponds to one open view of a note.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use notably_llm::{Message, TextGenerator};
use notably_store::{Note, NoteStore, NoteUpdate};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::error::{DomainError, Result};
use crate::extraction::Extractor;
use crate::prompts::{revision_prompt, summary_prompt, title_prompt};
use crate::share::{Clipboard, ShareOutcome, ShareSheet, share_note};
use crate::stream::StreamAccumulator;

/// Holds the generating flag for the lifetime of one operation.
struct GeneratingGuard<'a>(&'a AtomicBool);

impl<'a> GeneratingGuard<'a> {
    fn acquire(flag: &'a AtomicBool, note_id: &str) -> Result<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(DomainError::Busy(note_id.to_string()));
        }
        Ok(Self(flag))
    }
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Controller for a single note's detail view.
#[derive(Debug)]
pub struct NoteDetailController {
    note_id: String,
    store: Arc<NoteStore>,
    generator: TextGenerator,
    extractor: Extractor,
    generating: AtomicBool,
    auto_triggered: AtomicBool,
    streaming: watch::Sender<String>,
}

impl NoteDetailController {
    pub fn new(
        note_id: impl Into<String>,
        store: Arc<NoteStore>,
        generator: TextGenerator,
        extractor: Extractor,
    ) -> Self {
        let (streaming, _) = watch::channel(String::new());
        Self {
            note_id: note_id.into(),
            store,
            generator,
            extractor,
            generating: AtomicBool::new(false),
            auto_triggered: AtomicBool::new(false),
            streaming,
        }
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    /// Current state of the note, if it still exists.
    pub fn note(&self) -> Option<Note> {
        self.store.get(&self.note_id)
    }

    fn require_note(&self) -> Result<Note> {
        self.note()
            .ok_or_else(|| DomainError::NoteNotFound(self.note_id.clone()))
    }

    /// True while a generation or revision is in flight.
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    /// Partial text of the stream in progress. Empty between operations
    /// that failed or have not started.
    pub fn streaming_text(&self) -> watch::Receiver<String> {
        self.streaming.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Generation
    // ─────────────────────────────────────────────────────────────────────

    /// Called when the view is first shown.
    ///
    /// Starts generation if the note is still awaiting it and has a source.
    /// Fires at most once per controller; returns whether it ran.
    pub async fn open(&self) -> Result<bool> {
        let note = self.require_note()?;
        if !note.is_awaiting_generation() || !note.has_source() {
            return Ok(false);
        }
        if self.auto_triggered.swap(true, Ordering::AcqRel) {
            debug!(note_id = %self.note_id, "Automatic generation already triggered");
            return Ok(false);
        }

        self.generate().await?;
        Ok(true)
    }

    /// Extract the source, name the note, and stream its summary.
    ///
    /// On failure the note keeps whatever summary it had, so a note awaiting
    /// generation can be retried.
    pub async fn generate(&self) -> Result<Note> {
        let _guard = GeneratingGuard::acquire(&self.generating, &self.note_id)?;

        match self.run_generation().await {
            Ok(note) => Ok(note),
            Err(e) => {
                error!(note_id = %self.note_id, error = %e, "Note generation failed");
                Err(e)
            }
        }
    }

    async fn run_generation(&self) -> Result<Note> {
        let note = self.require_note()?;
        let uri = note
            .file_uri
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| DomainError::MissingSource(self.note_id.clone()))?;

        info!(
            note_id = %self.note_id,
            file = %note.source_file_name,
            format = %note.format,
            "Generating note"
        );

        let content = self
            .extractor
            .extract(&uri, note.file_mime_type.as_deref(), &note.source_file_name)
            .await?;

        let title = self
            .generator
            .generate(vec![Message::user(title_prompt(&content))])
            .await
            .map_err(DomainError::Generation)?;
        self.store.update_note(
            &self.note_id,
            NoteUpdate::new().title(title.trim()).content(content.as_str()),
        );

        let prompt = summary_prompt(&content, note.format, note.custom_instructions.as_deref());
        let summary = self
            .stream_text(prompt)
            .await
            .map_err(DomainError::Generation)?;
        self.commit_summary(summary)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Revision
    // ─────────────────────────────────────────────────────────────────────

    /// Rewrite the summary per a free-form instruction.
    pub async fn revise(&self, instruction: &str) -> Result<Note> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(DomainError::EmptyInstruction);
        }

        let _guard = GeneratingGuard::acquire(&self.generating, &self.note_id)?;
        let note = self.require_note()?;
        if note.is_awaiting_generation() {
            return Err(DomainError::NotReady(self.note_id.clone()));
        }

        debug!(
            note_id = %self.note_id,
            instruction_len = instruction.len(),
            "Revising note"
        );
        let prompt = revision_prompt(&note.summary, instruction, note.format);
        match self.stream_text(prompt).await {
            Ok(summary) => self.commit_summary(summary),
            Err(e) => {
                error!(note_id = %self.note_id, error = %e, "Note revision failed");
                Err(DomainError::Revision(e))
            }
        }
    }

    async fn stream_text(&self, prompt: String) -> notably_llm::Result<String> {
        let accumulator = StreamAccumulator::new(&self.streaming);
        let stream = match self.generator.stream(vec![Message::user(prompt)]).await {
            Ok(stream) => stream,
            Err(e) => {
                accumulator.discard();
                return Err(e);
            }
        };
        accumulator.collect(stream).await
    }

    fn commit_summary(&self, summary: String) -> Result<Note> {
        let chars = summary.chars().count();
        self.store
            .update_note(&self.note_id, NoteUpdate::new().summary(summary));
        self.streaming.send_replace(String::new());

        // The note may have been deleted while the stream was running.
        let note = self.require_note()?;
        info!(note_id = %self.note_id, chars, "Summary updated");
        Ok(note)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Other actions
    // ─────────────────────────────────────────────────────────────────────

    /// Re-attach a source handle so generation can be retried after the
    /// transient one was lost.
    pub fn attach_source(&self, uri: impl Into<String>, mime_type: impl Into<String>) -> Result<()> {
        self.require_note()?;
        self.store.update_note(
            &self.note_id,
            NoteUpdate::new().file_uri(uri).file_mime_type(mime_type),
        );
        Ok(())
    }

    /// Share `"{title}\n\n{summary}"`, falling back to the clipboard when the
    /// sheet is unavailable or refused.
    pub async fn share(&self, sheet: &dyn ShareSheet, clipboard: &dyn Clipboard) -> Result<ShareOutcome> {
        let note = self.require_note()?;
        share_note(&note, sheet, clipboard).await
    }

    /// Remove the note. Returns whether it existed.
    pub fn delete(&self) -> bool {
        let removed = self.store.delete_note(&self.note_id);
        if removed {
            info!(note_id = %self.note_id, "Note deleted");
        }
        removed
    }
}
