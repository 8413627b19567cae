//! CLI command handlers.

pub mod add;
pub mod config;
pub mod delete;
pub mod generate;
pub mod list;
pub mod revise;
pub mod share;
pub mod show;

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use notably_config::{NotablyConfig, require_api_key};
use notably_domain::{DomainError, DomainServices, LocalSourceFetcher, Note, NoteStore};
use notably_llm::{AnthropicBackend, AnthropicConfig, TextGenerator};
use notably_store::{FileKvStore, StoreConfig, StoreEvent};
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Merged configuration.
    pub config: NotablyConfig,
}

/// An opened note store plus its event feed, subscribed before any change.
pub struct Session {
    pub store: Arc<NoteStore>,
    events: broadcast::Receiver<StoreEvent>,
}

impl Context {
    /// Open the file-backed store and wait for the initial load.
    pub async fn open_store(&self) -> Result<Session> {
        let storage = self.config.storage();
        let dir = storage.effective_data_dir()?;
        debug!(dir = %dir.display(), "Opening note store");

        let kv = Arc::new(FileKvStore::new(dir));
        let store = Arc::new(NoteStore::new(
            kv,
            StoreConfig {
                key: storage.effective_notes_key().to_string(),
                content_limit: storage.effective_content_limit(),
            },
        ));
        let events = store.subscribe();
        store.load().await;
        Ok(Session { store, events })
    }

    /// Build the generation services. Fails when no API key is available.
    pub fn services(&self, store: Arc<NoteStore>) -> Result<DomainServices> {
        let llm = self.config.llm();
        let backend = llm.effective_backend();
        let secret = require_api_key(&backend, llm.api_key.as_deref())?;
        debug!(backend = %backend, source = %secret.source, "Resolved API key");

        let mut anthropic = AnthropicConfig::new(secret.value).with_timeout(llm.effective_timeout());
        if let Some(url) = &llm.base_url {
            anthropic = anthropic.with_base_url(url.clone());
        }
        let backend = Arc::new(AnthropicBackend::new(anthropic).context("creating LLM backend")?);
        let generator = TextGenerator::new(backend, llm.effective_model(), llm.effective_max_tokens()?);

        Ok(DomainServices::new(store, generator, Arc::new(LocalSourceFetcher)))
    }
}

impl Session {
    /// Look up a note or fail with a user-facing message.
    pub fn require(&self, id: &str) -> Result<Note> {
        match self.store.get(id) {
            Some(note) => Ok(note),
            None => bail!("Note not found: {}", id),
        }
    }

    /// Wait for pending writes, then report any that failed.
    pub async fn finish(mut self) -> Result<()> {
        self.store.flush().await;

        let yellow = Style::new().yellow();
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if let Some(warning) = event.warning() {
                        eprintln!("{} {}", yellow.apply_to("Warning:"), warning);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    debug!(skipped = n, "Store events lagged");
                }
                Err(_) => break,
            }
        }
        Ok(())
    }
}

/// Wrap a domain failure so its alert text leads and the cause follows.
pub fn domain_failure(err: DomainError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

/// Drive a generation or revision while echoing its partial text.
///
/// A spinner covers the time before the first fragment arrives. Nothing is
/// echoed in JSON mode.
pub async fn with_live_text<F, T>(
    ctx: &Context,
    message: &str,
    mut partial: watch::Receiver<String>,
    op: F,
) -> T
where
    F: Future<Output = T>,
{
    let spinner = (!ctx.json_output).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    tokio::pin!(op);
    let mut printed = 0usize;
    let mut stdout = std::io::stdout();

    let result = loop {
        tokio::select! {
            result = &mut op => break result,
            changed = partial.changed() => {
                if changed.is_err() {
                    break (&mut op).await;
                }
                if ctx.json_output {
                    continue;
                }
                let text = partial.borrow_and_update().clone();
                if text.is_empty() {
                    continue;
                }
                if let Some(pb) = &spinner
                    && !pb.is_finished()
                {
                    pb.finish_and_clear();
                }
                if text.len() < printed || !text.is_char_boundary(printed) {
                    printed = 0;
                    let _ = writeln!(stdout);
                }
                let _ = write!(stdout, "{}", &text[printed..]);
                let _ = stdout.flush();
                printed = text.len();
            }
        }
    };

    if let Some(pb) = spinner
        && !pb.is_finished()
    {
        pb.finish_and_clear();
    }
    if printed > 0 {
        let _ = writeln!(stdout);
    }
    result
}
