//! Domain layer for Notably.
//!
//! Sits between front ends and the store/generation crates:
//!
//! - **Detail controller**: first generation pass, revisions, share, delete
//! - **Extraction**: source bytes to text, by MIME type
//! - **Uploads**: picked files to draft notes
//! - **Rendering**: line classification for generated summaries
//!
//! # Example
//!
//! ```ignore
//! use notably_domain::DomainServices;
//!
//! let services = DomainServices::new(store, generator, Arc::new(LocalSourceFetcher));
//! let note = services.upload(Some(picked), &UploadOptions::default())?;
//! services.controller(note.id).open().await?;
//! ```

mod error;
pub mod extraction;
pub mod prompts;
pub mod render;
pub mod services;
pub mod share;
pub mod stream;
pub mod upload;

pub use error::{DomainError, Result};
pub use extraction::{
    DEFAULT_MIME_TYPE, ExtractionKind, Extractor, LocalSourceFetcher, SharedFetcher,
    SourceFetcher,
};
pub use render::{SummaryLine, parse_summary};
pub use services::{DomainServices, NoteDetailController};
pub use share::{Clipboard, NoShareSheet, ShareError, ShareOutcome, ShareSheet, share_note};
pub use stream::StreamAccumulator;
pub use upload::{PickedFile, UploadOptions, draft_note, mime_from_extension};

// Re-export key types from the store for convenience
pub use notably_store::{Note, NoteFormat, NoteStore, SourceType};
