//! The authoritative in-memory note collection.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::id::observe_note_id;
use crate::kv::{MemoryKvStore, SharedKvStore};
use crate::note::{DEFAULT_CONTENT_LIMIT, Note, NoteUpdate, PersistedNote};
use crate::writer::PersistenceWriter;

/// Storage key holding the whole collection.
pub const NOTES_KEY: &str = "notably-notes";

/// Event channel capacity. Slow subscribers see `Lagged` past this.
const EVENT_CAPACITY: usize = 64;

/// Configuration for a [`NoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Key the serialized collection is stored under.
    pub key: String,
    /// Per-note cap on persisted `content`, in characters.
    pub content_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key: NOTES_KEY.to_string(),
            content_limit: DEFAULT_CONTENT_LIMIT,
        }
    }
}

#[derive(Debug)]
struct State {
    /// Newest first.
    notes: Vec<Note>,
    loading: bool,
    /// A mutation happened before the initial load finished.
    dirty_before_load: bool,
}

/// Note collection with asynchronous, last-write-wins persistence.
///
/// Mutations apply to memory synchronously and return at once; the
/// projected collection is then queued for the background writer. Until
/// [`load`](Self::load) completes nothing is written, so an early mutation
/// cannot overwrite the stored collection before it has been read.
#[derive(Debug)]
pub struct NoteStore {
    config: StoreConfig,
    kv: SharedKvStore,
    state: RwLock<State>,
    events: broadcast::Sender<StoreEvent>,
    writer: PersistenceWriter,
    load_started: AtomicBool,
}

impl NoteStore {
    /// Create a store over `kv`. Must be called inside a tokio runtime.
    pub fn new(kv: SharedKvStore, config: StoreConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let writer = PersistenceWriter::spawn(kv.clone(), config.key.clone(), events.clone());
        Self {
            config,
            kv,
            state: RwLock::new(State {
                notes: Vec::new(),
                loading: true,
                dirty_before_load: false,
            }),
            events,
            writer,
            load_started: AtomicBool::new(false),
        }
    }

    /// A store backed by a fresh [`MemoryKvStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()), StoreConfig::default())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────

    /// Read the stored collection into memory.
    ///
    /// Runs once per store; later calls return immediately. A missing key,
    /// a read failure, or an unparseable blob all yield an empty collection.
    /// Notes added before loading finished stay at the head, and stored
    /// notes whose id is already in memory are skipped.
    /// Every stored id seeds [`next_note_id`](crate::id::next_note_id).
    pub async fn load(&self) {
        if self.load_started.swap(true, Ordering::AcqRel) {
            return;
        }

        let stored = self.read_stored().await;

        let (count, dirty) = {
            let mut state = self.state.write();
            let mut seen: HashSet<String> = state.notes.iter().map(|n| n.id.clone()).collect();
            let mut skipped = 0usize;
            for note in stored {
                observe_note_id(&note.id);
                if seen.insert(note.id.clone()) {
                    state.notes.push(note);
                } else {
                    skipped += 1;
                }
            }
            if skipped > 0 {
                warn!(skipped, "Skipped stored notes with duplicate ids");
            }

            state.loading = false;
            let dirty = std::mem::take(&mut state.dirty_before_load);
            if dirty {
                self.persist_locked(&state);
            }
            (state.notes.len(), dirty)
        };

        info!(count, merged_pending = dirty, "Notes loaded");
        let _ = self.events.send(StoreEvent::Loaded { count });
    }

    async fn read_stored(&self) -> Vec<Note> {
        let text = match self.kv.get(&self.config.key).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(key = %self.config.key, "No stored notes");
                return Vec::new();
            }
            Err(e) => {
                warn!(key = %self.config.key, error = %e, "Failed to read stored notes");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<PersistedNote>>(&text) {
            Ok(records) => records.into_iter().map(Note::from).collect(),
            Err(e) => {
                warn!(key = %self.config.key, error = %e, "Stored notes are unreadable, starting empty");
                Vec::new()
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Insert `note` at the head of the collection.
    pub fn add_note(&self, note: Note) -> Result<()> {
        let id = note.id.clone();
        {
            let mut state = self.state.write();
            if state.notes.iter().any(|n| n.id == id) {
                return Err(StoreError::DuplicateId(id));
            }
            state.notes.insert(0, note);
            self.persist_or_defer(&mut state);
        }

        debug!(note_id = %id, "Note added");
        let _ = self.events.send(StoreEvent::Added { id });
        Ok(())
    }

    /// Remove the note with `id`. Returns whether a note was removed.
    pub fn delete_note(&self, id: &str) -> bool {
        {
            let mut state = self.state.write();
            let before = state.notes.len();
            state.notes.retain(|n| n.id != id);
            if state.notes.len() == before {
                debug!(note_id = %id, "Delete ignored, note not found");
                return false;
            }
            self.persist_or_defer(&mut state);
        }

        debug!(note_id = %id, "Note deleted");
        let _ = self.events.send(StoreEvent::Deleted { id: id.to_string() });
        true
    }

    /// Merge `update` into the note with `id`. Returns whether anything
    /// changed; a missing id is a no-op.
    pub fn update_note(&self, id: &str, update: NoteUpdate) -> bool {
        {
            let mut state = self.state.write();
            let Some(note) = state.notes.iter_mut().find(|n| n.id == id) else {
                debug!(note_id = %id, "Update ignored, note not found");
                return false;
            };
            if !note.apply(update) {
                return false;
            }
            self.persist_or_defer(&mut state);
        }

        debug!(note_id = %id, "Note updated");
        let _ = self.events.send(StoreEvent::Updated { id: id.to_string() });
        true
    }

    fn persist_or_defer(&self, state: &mut State) {
        if state.loading {
            state.dirty_before_load = true;
        } else {
            self.persist_locked(state);
        }
    }

    /// Serialize and queue the collection. Called with the write lock held so
    /// snapshots reach the writer in mutation order.
    fn persist_locked(&self, state: &State) {
        match serialize(&state.notes, self.config.content_limit) {
            Ok(payload) => {
                self.writer.submit(payload);
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize notes");
                let _ = self.events.send(StoreEvent::PersistFailed {
                    message: e.to_string(),
                    storage_full: false,
                });
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Snapshot of all notes, newest first.
    pub fn notes(&self) -> Vec<Note> {
        self.state.read().notes.clone()
    }

    pub fn get(&self, id: &str) -> Option<Note> {
        self.state.read().notes.iter().find(|n| n.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().notes.is_empty()
    }

    /// True until the initial [`load`](Self::load) completes.
    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    /// Receive change notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// The collection as it would be persisted.
    pub fn to_json(&self) -> Result<String> {
        serialize(&self.state.read().notes, self.config.content_limit)
    }

    /// Wait until every mutation issued so far has been attempted by the
    /// writer.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}

fn serialize(notes: &[Note], content_limit: usize) -> Result<String> {
    let records: Vec<PersistedNote> = notes
        .iter()
        .map(|n| PersistedNote::project(n, content_limit))
        .collect();
    Ok(serde_json::to_string(&records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{FileKvStore, InjectedFailure, KeyValueStore};
    use crate::note::tests::sample_note;
    use tempfile::TempDir;

    async fn loaded_store(kv: Arc<MemoryKvStore>) -> NoteStore {
        let store = NoteStore::new(kv, StoreConfig::default());
        store.load().await;
        store
    }

    fn ids(store: &NoteStore) -> Vec<String> {
        store.notes().into_iter().map(|n| n.id).collect()
    }

    #[tokio::test]
    async fn test_load_missing_key_is_empty() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = NoteStore::new(kv, StoreConfig::default());
        assert!(store.is_loading());
        store.load().await;
        assert!(!store.is_loading());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_blob_is_empty() {
        let kv = Arc::new(MemoryKvStore::new().with_value(NOTES_KEY, "{not json"));
        let store = loaded_store(kv).await;
        assert!(store.is_empty());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_load_runs_once() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = loaded_store(kv.clone()).await;
        store.add_note(sample_note("1")).unwrap();
        store.flush().await;

        kv.set(NOTES_KEY, "[]").await.unwrap();
        store.load().await;
        assert_eq!(ids(&store), vec!["1"]);
    }

    #[tokio::test]
    async fn test_add_prepends_and_persists() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = loaded_store(kv.clone()).await;
        let mut events = store.subscribe();

        store.add_note(sample_note("1")).unwrap();
        store.add_note(sample_note("2")).unwrap();
        assert_eq!(ids(&store), vec!["2", "1"]);
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::Added {
                id: "1".to_string()
            }
        );

        store.flush().await;
        let raw = kv.raw(NOTES_KEY).unwrap();
        let stored: Vec<PersistedNote> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, "2");
        assert!(!raw.contains("fileUri"));
    }

    #[tokio::test]
    async fn test_add_duplicate_rejected() {
        let store = loaded_store(Arc::new(MemoryKvStore::new())).await;
        store.add_note(sample_note("1")).unwrap();
        let err = store.add_note(sample_note("1")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == "1"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = loaded_store(kv.clone()).await;
        store.add_note(sample_note("1")).unwrap();
        store.flush().await;
        let writes = kv.write_count();

        assert!(!store.delete_note("999"));
        store.flush().await;
        assert_eq!(ids(&store), vec!["1"]);
        assert_eq!(kv.write_count(), writes);
    }

    #[tokio::test]
    async fn test_delete_twice_same_as_once() {
        let store = loaded_store(Arc::new(MemoryKvStore::new())).await;
        store.add_note(sample_note("1")).unwrap();
        store.add_note(sample_note("2")).unwrap();

        assert!(store.delete_note("1"));
        let once = store.notes();
        assert!(!store.delete_note("1"));
        assert_eq!(store.notes(), once);
    }

    #[tokio::test]
    async fn test_update_is_shallow_and_keyed() {
        let store = loaded_store(Arc::new(MemoryKvStore::new())).await;
        store.add_note(sample_note("1")).unwrap();
        store.add_note(sample_note("2")).unwrap();

        assert!(store.update_note("1", NoteUpdate::new().title("X").summary("Y")));
        let one = store.get("1").unwrap();
        assert_eq!((one.title.as_str(), one.summary.as_str()), ("X", "Y"));
        assert_eq!(one.source_file_name, "lecture.txt");
        assert!(store.get("2").unwrap().is_awaiting_generation());

        assert!(!store.update_note("404", NoteUpdate::new().title("Z")));
    }

    #[tokio::test]
    async fn test_update_ignores_empty_summary() {
        let store = loaded_store(Arc::new(MemoryKvStore::new())).await;
        store.add_note(sample_note("1")).unwrap();
        store.update_note("1", NoteUpdate::new().summary("done"));
        assert!(!store.update_note("1", NoteUpdate::new().summary("")));
        assert_eq!(store.get("1").unwrap().summary, "done");
    }

    #[tokio::test]
    async fn test_content_boundary() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = loaded_store(kv.clone()).await;

        let mut exact = sample_note("exact");
        exact.content = "a".repeat(5000);
        let mut over = sample_note("over");
        over.content = "b".repeat(5001);
        store.add_note(exact).unwrap();
        store.add_note(over).unwrap();
        assert_eq!(store.get("over").unwrap().content.len(), 5001);

        store.flush().await;
        let reloaded = loaded_store(kv).await;
        assert_eq!(reloaded.get("exact").unwrap().content, "a".repeat(5000));
        assert_eq!(reloaded.get("over").unwrap().content, "b".repeat(5000));
    }

    #[tokio::test]
    async fn test_round_trip_drops_file_uri() {
        let dir = TempDir::new().unwrap();
        let kv = Arc::new(FileKvStore::new(dir.path()));

        let store = NoteStore::new(kv.clone(), StoreConfig::default());
        store.load().await;
        let mut note = sample_note("1");
        note.summary = "- point".to_string();
        note.custom_instructions = Some("focus on dates".to_string());
        store.add_note(note.clone()).unwrap();
        store.flush().await;
        drop(store);

        let reloaded = NoteStore::new(kv, StoreConfig::default());
        reloaded.load().await;
        let mut expected = note;
        expected.file_uri = None;
        assert_eq!(reloaded.notes(), vec![expected]);
    }

    #[tokio::test]
    async fn test_add_before_load_keeps_stored_notes() {
        let kv = Arc::new(MemoryKvStore::new());
        {
            let store = loaded_store(kv.clone()).await;
            store.add_note(sample_note("old")).unwrap();
            store.flush().await;
        }

        let store = NoteStore::new(kv.clone(), StoreConfig::default());
        store.add_note(sample_note("new")).unwrap();
        store.flush().await;
        assert!(kv.raw(NOTES_KEY).unwrap().contains("\"old\""));

        store.load().await;
        assert_eq!(ids(&store), vec!["new", "old"]);
        store.flush().await;
        let stored: Vec<PersistedNote> =
            serde_json::from_str(&kv.raw(NOTES_KEY).unwrap()).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_load_skips_colliding_ids() {
        let kv = Arc::new(MemoryKvStore::new());
        {
            let store = loaded_store(kv.clone()).await;
            let mut stored = sample_note("1");
            stored.title = "stored".to_string();
            store.add_note(stored).unwrap();
            store.flush().await;
        }

        let store = NoteStore::new(kv, StoreConfig::default());
        let mut fresh = sample_note("1");
        fresh.title = "fresh".to_string();
        store.add_note(fresh).unwrap();
        store.load().await;

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("1").unwrap().title, "fresh");
    }

    #[tokio::test]
    async fn test_load_seeds_note_ids() {
        let future = crate::id::next_note_id().parse::<u64>().unwrap() + 3_600_000;
        let kv = Arc::new(MemoryKvStore::new());
        {
            let store = loaded_store(kv.clone()).await;
            store.add_note(sample_note(&future.to_string())).unwrap();
            store.flush().await;
        }

        let store = loaded_store(kv).await;
        let next: u64 = crate::id::next_note_id().parse().unwrap();
        assert!(next > future);
        assert!(store.get(&next.to_string()).is_none());
    }

    #[tokio::test]
    async fn test_quota_failure_keeps_state_and_warns() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = loaded_store(kv.clone()).await;
        let mut events = store.subscribe();
        kv.fail_writes(Some(InjectedFailure::StorageFull));

        store.add_note(sample_note("1")).unwrap();
        store.flush().await;

        assert_eq!(ids(&store), vec!["1"]);
        let mut warning = None;
        while let Ok(event) = events.try_recv() {
            if let Some(text) = event.warning() {
                warning = Some(text);
            }
        }
        assert!(warning.unwrap().contains("Storage is full"));
    }

    #[tokio::test]
    async fn test_load_emits_count() {
        let kv = Arc::new(MemoryKvStore::new());
        {
            let store = loaded_store(kv.clone()).await;
            store.add_note(sample_note("1")).unwrap();
            store.add_note(sample_note("2")).unwrap();
            store.flush().await;
        }
        let store = NoteStore::new(kv, StoreConfig::default());
        let mut events = store.subscribe();
        store.load().await;
        assert_eq!(events.recv().await.unwrap(), StoreEvent::Loaded { count: 2 });
    }

    mod model {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(u8),
            Update(u8, Option<String>, Option<String>),
            Delete(u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..6).prop_map(Op::Add),
                (
                    0u8..6,
                    proptest::option::of("[a-z]{0,4}"),
                    proptest::option::of("[a-z]{0,4}")
                )
                    .prop_map(|(id, t, s)| Op::Update(id, t, s)),
                (0u8..6).prop_map(Op::Delete),
            ]
        }

        fn apply_to_model(model: &mut Vec<Note>, op: &Op) {
            match op {
                Op::Add(id) => {
                    let id = id.to_string();
                    if !model.iter().any(|n| n.id == id) {
                        model.insert(0, sample_note(&id));
                    }
                }
                Op::Update(id, title, summary) => {
                    if let Some(note) = model.iter_mut().find(|n| n.id == id.to_string()) {
                        if let Some(title) = title {
                            note.title = title.clone();
                        }
                        if let Some(summary) = summary
                            && !(summary.is_empty() && !note.summary.is_empty())
                        {
                            note.summary = summary.clone();
                        }
                    }
                }
                Op::Delete(id) => model.retain(|n| n.id != id.to_string()),
            }
        }

        fn apply_to_store(store: &NoteStore, op: &Op) {
            match op {
                Op::Add(id) => {
                    let _ = store.add_note(sample_note(&id.to_string()));
                }
                Op::Update(id, title, summary) => {
                    let mut update = NoteUpdate::new();
                    update.title = title.clone();
                    update.summary = summary.clone();
                    store.update_note(&id.to_string(), update);
                }
                Op::Delete(id) => {
                    store.delete_note(&id.to_string());
                }
            }
        }

        proptest! {
            #[test]
            fn store_matches_reference_list(ops in proptest::collection::vec(op(), 0..40)) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let kv = Arc::new(MemoryKvStore::new());
                    let store = loaded_store(kv.clone()).await;
                    let mut model = Vec::new();

                    for op in &ops {
                        apply_to_model(&mut model, op);
                        apply_to_store(&store, op);
                        prop_assert_eq!(store.notes(), model.clone());
                    }

                    store.flush().await;
                    let reloaded = loaded_store(kv).await;
                    let expected: Vec<Note> = model
                        .into_iter()
                        .map(|mut n| {
                            n.file_uri = None;
                            n
                        })
                        .collect();
                    prop_assert_eq!(reloaded.notes(), expected);
                    Ok(())
                })?;
            }
        }
    }
}
