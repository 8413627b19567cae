//! Domain error types.

use notably_llm::LlmError;
use notably_store::StoreError;
use thiserror::Error;

/// Domain-level errors.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No note with this id in the store.
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// A generation or revision is already running for this note.
    #[error("Generation already in progress for note {0}")]
    Busy(String),

    /// The note has no source file attached.
    #[error("Note {0} has no source file attached")]
    MissingSource(String),

    /// Revision requested before the note has a summary.
    #[error("Note {0} has not been generated yet")]
    NotReady(String),

    /// Revision instruction was blank.
    #[error("Revision instruction is empty")]
    EmptyInstruction,

    /// Reading the source file failed.
    #[error("Failed to read source '{uri}': {message}")]
    Extraction { uri: String, message: String },

    /// Title or summary generation failed.
    #[error("Generation failed: {0}")]
    Generation(#[source] LlmError),

    /// Revision call failed.
    #[error("Revision failed: {0}")]
    Revision(#[source] LlmError),

    /// Share sheet and clipboard both failed.
    #[error("Share failed: {0}")]
    Share(String),

    /// Store rejected the operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Alert text for the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            DomainError::Extraction { .. }
            | DomainError::Generation(_)
            | DomainError::MissingSource(_) => "Failed to generate notes. Please try again.",
            DomainError::Revision(_) | DomainError::EmptyInstruction => {
                "Failed to update note. Please try again."
            }
            DomainError::Share(_) => "Failed to share note. Please try again.",
            DomainError::Busy(_) => "AI is still writing. Please wait for it to finish.",
            DomainError::NotReady(_) => "Notes are still being generated.",
            DomainError::NoteNotFound(_) => "Note not found",
            DomainError::Store(_) => "Failed to save note. Please try again.",
        }
    }

    /// True when repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::Extraction { .. }
                | DomainError::Generation(_)
                | DomainError::Revision(_)
                | DomainError::Share(_)
                | DomainError::Busy(_)
        )
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
