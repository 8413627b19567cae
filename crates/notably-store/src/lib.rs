//! Note collection for Notably.
//!
//! [`NoteStore`] owns the in-memory list of notes and mirrors every mutation
//! to a [`KeyValueStore`] in the background. What gets written is a
//! projection of each note: the transient `fileUri` is dropped and `content`
//! is cut to a fixed number of characters so the blob stays bounded.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use notably_store::{FileKvStore, NoteStore, StoreConfig};
//!
//! let store = Arc::new(NoteStore::new(
//!     Arc::new(FileKvStore::new(data_dir)),
//!     StoreConfig::default(),
//! ));
//! store.load().await;
//! ```

pub mod error;
pub mod events;
pub mod id;
pub mod kv;
pub mod note;
pub mod store;
pub mod writer;

pub use error::{Result, StorageError, StoreError};
pub use events::StoreEvent;
pub use id::{NoteIdGenerator, next_note_id, observe_note_id};
pub use kv::{FileKvStore, InjectedFailure, KeyValueStore, MemoryKvStore, SharedKvStore};
pub use note::{
    DEFAULT_CONTENT_LIMIT, Note, NoteFormat, NoteUpdate, PLACEHOLDER_TITLE, PersistedNote,
    SourceType, truncate_chars,
};
pub use store::{NOTES_KEY, NoteStore, StoreConfig};
pub use writer::PersistenceWriter;
