//! Background persistence with last-write-wins coalescing.
//!
//! Mutations hand the writer a fully serialized snapshot. The snapshot slot
//! is a `watch` channel, so a burst of mutations while a write is in flight
//! collapses into a single follow-up write of the newest state.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::events::StoreEvent;
use crate::kv::SharedKvStore;

#[derive(Debug)]
struct Snapshot {
    revision: u64,
    payload: String,
}

/// Owns the background task writing snapshots to a [`KeyValueStore`](crate::KeyValueStore).
#[derive(Debug)]
pub struct PersistenceWriter {
    snapshots: watch::Sender<Option<Arc<Snapshot>>>,
    attempted: watch::Receiver<u64>,
}

impl PersistenceWriter {
    /// Spawn the writer task. Must be called inside a tokio runtime.
    ///
    /// The task drains the newest snapshot and exits once the writer is
    /// dropped.
    pub fn spawn(
        kv: SharedKvStore,
        key: impl Into<String>,
        events: broadcast::Sender<StoreEvent>,
    ) -> Self {
        let (snapshots, rx) = watch::channel(None);
        let (attempted_tx, attempted) = watch::channel(0);
        tokio::spawn(run(kv, key.into(), rx, attempted_tx, events));
        Self {
            snapshots,
            attempted,
        }
    }

    /// Queue `payload` as the newest state and return its revision.
    ///
    /// Callers must serialize submissions in mutation order.
    pub fn submit(&self, payload: String) -> u64 {
        let mut revision = 0;
        self.snapshots.send_modify(|slot| {
            revision = slot.as_ref().map_or(0, |s| s.revision) + 1;
            *slot = Some(Arc::new(Snapshot { revision, payload }));
        });
        revision
    }

    /// Newest revision handed to the writer.
    pub fn latest_revision(&self) -> u64 {
        self.snapshots.borrow().as_ref().map_or(0, |s| s.revision)
    }

    /// Wait until the newest submitted snapshot (or a later one) has been
    /// attempted, successfully or not.
    pub async fn flush(&self) {
        let target = self.latest_revision();
        let mut attempted = self.attempted.clone();
        if attempted.wait_for(|&done| done >= target).await.is_err() {
            tracing::warn!(target, "Persistence writer stopped before flush completed");
        }
    }
}

async fn run(
    kv: SharedKvStore,
    key: String,
    mut snapshots: watch::Receiver<Option<Arc<Snapshot>>>,
    attempted: watch::Sender<u64>,
    events: broadcast::Sender<StoreEvent>,
) {
    while snapshots.changed().await.is_ok() {
        let Some(snapshot) = snapshots.borrow_and_update().clone() else {
            continue;
        };

        match kv.set(&key, &snapshot.payload).await {
            Ok(()) => {
                tracing::debug!(
                    key = %key,
                    revision = snapshot.revision,
                    bytes = snapshot.payload.len(),
                    "Persisted notes"
                );
            }
            Err(e) => {
                let storage_full = e.is_storage_full();
                tracing::warn!(
                    key = %key,
                    revision = snapshot.revision,
                    storage_full,
                    error = %e,
                    "Failed to persist notes"
                );
                let _ = events.send(StoreEvent::PersistFailed {
                    message: e.to_string(),
                    storage_full,
                });
            }
        }

        attempted.send_replace(snapshot.revision);
    }
    tracing::trace!(key = %key, "Persistence writer exiting");
}
