//! Domain services.
//!
//! [`DomainServices`] bundles the shared collaborators (store, generator,
//! source fetcher) and hands out per-note controllers.

pub mod detail;

use std::sync::Arc;

use notably_llm::TextGenerator;
use notably_store::{Note, NoteStore};
use tracing::info;

use crate::error::Result;
use crate::extraction::{Extractor, SharedFetcher};
use crate::upload::{PickedFile, UploadOptions, create_note};

pub use detail::NoteDetailController;

/// Domain services facade.
///
/// Entry point for front ends: the CLI builds one of these and asks it for
/// controllers instead of wiring collaborators itself.
#[derive(Debug, Clone)]
pub struct DomainServices {
    store: Arc<NoteStore>,
    generator: TextGenerator,
    fetcher: SharedFetcher,
}

impl DomainServices {
    pub fn new(store: Arc<NoteStore>, generator: TextGenerator, fetcher: SharedFetcher) -> Self {
        info!(
            backend = generator.backend_name(),
            model = generator.model(),
            "Initializing domain services"
        );
        Self {
            store,
            generator,
            fetcher,
        }
    }

    pub fn store(&self) -> &Arc<NoteStore> {
        &self.store
    }

    pub fn generator(&self) -> &TextGenerator {
        &self.generator
    }

    /// A fresh controller for `note_id`, as when a detail view opens.
    pub fn controller(&self, note_id: impl Into<String>) -> NoteDetailController {
        let extractor = Extractor::new(self.fetcher.clone(), self.generator.clone());
        NoteDetailController::new(
            note_id,
            self.store.clone(),
            self.generator.clone(),
            extractor,
        )
    }

    /// Create a draft for a picked file. `None` means the pick was cancelled.
    pub fn upload(&self, picked: Option<PickedFile>, options: &UploadOptions) -> Result<Option<Note>> {
        create_note(&self.store, picked, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::LocalSourceFetcher;
    use notably_llm::MockBackend;
    use notably_store::NoteFormat;

    #[tokio::test]
    async fn test_upload_then_open() {
        let store = Arc::new(NoteStore::in_memory());
        store.load().await;
        let generator = TextGenerator::new(
            Arc::new(MockBackend::with_texts(["Mitosis Basics", "- Cells divide"])),
            "test-model",
            1024,
        );
        let services = DomainServices::new(store.clone(), generator, Arc::new(LocalSourceFetcher));

        let picked = PickedFile::new("data:text/plain,cells divide", "bio.txt", Some("text/plain".into()));
        let draft = services
            .upload(Some(picked), &UploadOptions::new(NoteFormat::BulletPoints))
            .unwrap()
            .unwrap();

        let controller = services.controller(draft.id.clone());
        assert!(controller.open().await.unwrap());

        let note = store.get(&draft.id).unwrap();
        assert_eq!(note.title, "Mitosis Basics");
        assert_eq!(note.summary, "- Cells divide");
    }
}
