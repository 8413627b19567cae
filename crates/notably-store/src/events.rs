use serde::Serialize;

/// Change notification broadcast by [`NoteStore`](crate::NoteStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    /// Initial load finished with `count` notes in memory.
    Loaded { count: usize },
    Added { id: String },
    Updated { id: String },
    Deleted { id: String },
    /// A background write failed. In-memory state is unaffected.
    PersistFailed { message: String, storage_full: bool },
}

impl StoreEvent {
    /// Id of the note the event concerns, if any.
    pub fn note_id(&self) -> Option<&str> {
        match self {
            StoreEvent::Added { id } | StoreEvent::Updated { id } | StoreEvent::Deleted { id } => {
                Some(id)
            }
            StoreEvent::Loaded { .. } | StoreEvent::PersistFailed { .. } => None,
        }
    }

    /// Text for a user-visible warning, when the event warrants one.
    pub fn warning(&self) -> Option<String> {
        match self {
            StoreEvent::PersistFailed {
                storage_full: true, ..
            } => Some(
                "Storage is full. Recent changes to your notes may not be saved.".to_string(),
            ),
            StoreEvent::PersistFailed { message, .. } => {
                Some(format!("Failed to save notes: {}", message))
            }
            _ => None,
        }
    }
}
