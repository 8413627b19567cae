//! Share sheet and clipboard seams.

use async_trait::async_trait;
use notably_store::Note;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{DomainError, Result};

/// Why a share sheet did not share.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    /// The user dismissed the sheet.
    #[error("Share cancelled")]
    Cancelled,

    /// No share sheet on this platform.
    #[error("Sharing is not supported here")]
    Unsupported,

    /// The platform refused to open the sheet.
    #[error("Sharing not allowed: {0}")]
    Denied(String),

    #[error("{0}")]
    Failed(String),
}

impl ShareError {
    /// Failures that should fall back to copying instead.
    pub fn wants_fallback(&self) -> bool {
        matches!(self, ShareError::Unsupported | ShareError::Denied(_))
    }
}

/// Platform share sheet.
#[async_trait]
pub trait ShareSheet: Send + Sync {
    async fn share(&self, title: &str, text: &str) -> std::result::Result<(), ShareError>;
}

/// System clipboard.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn copy(&self, text: &str) -> std::result::Result<(), ShareError>;
}

/// How a share request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    /// Copied to the clipboard instead.
    Copied,
    Cancelled,
}

impl ShareOutcome {
    /// Confirmation to show, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ShareOutcome::Copied => Some("Note copied to clipboard"),
            ShareOutcome::Shared | ShareOutcome::Cancelled => None,
        }
    }
}

/// Share sheet that never exists, forcing the clipboard path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShareSheet;

#[async_trait]
impl ShareSheet for NoShareSheet {
    async fn share(&self, _title: &str, _text: &str) -> std::result::Result<(), ShareError> {
        Err(ShareError::Unsupported)
    }
}

/// Offer `"{title}\n\n{summary}"` to the share sheet, copying it instead
/// when the sheet is unavailable or refused.
pub async fn share_note(
    note: &Note,
    sheet: &dyn ShareSheet,
    clipboard: &dyn Clipboard,
) -> Result<ShareOutcome> {
    let text = note.share_text();

    match sheet.share(&note.title, &text).await {
        Ok(()) => Ok(ShareOutcome::Shared),
        Err(ShareError::Cancelled) => {
            debug!(note_id = %note.id, "Share cancelled");
            Ok(ShareOutcome::Cancelled)
        }
        Err(e) if e.wants_fallback() => {
            debug!(note_id = %note.id, reason = %e, "Share sheet unavailable, copying");
            clipboard.copy(&text).await.map_err(|e| {
                warn!(note_id = %note.id, error = %e, "Clipboard copy failed");
                DomainError::Share(e.to_string())
            })?;
            Ok(ShareOutcome::Copied)
        }
        Err(e) => {
            warn!(note_id = %note.id, error = %e, "Share failed");
            Err(DomainError::Share(e.to_string()))
        }
    }
}
