//! Terminal share targets.
//!
//! There is no share sheet on a terminal. Copying goes through the OSC 52
//! escape sequence, which most terminal emulators (and tmux with
//! `set-clipboard on`) forward to the system clipboard.

use std::io::Write;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use console::Term;
use notably_domain::{Clipboard, ShareError, ShareSheet};

/// Copies by writing an OSC 52 sequence to the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Osc52Clipboard;

impl Osc52Clipboard {
    pub fn new() -> Self {
        Self
    }
}

/// `ESC ] 52 ; c ; <base64> BEL`
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

#[async_trait]
impl Clipboard for Osc52Clipboard {
    async fn copy(&self, text: &str) -> Result<(), ShareError> {
        let term = Term::stderr();
        if !term.is_term() {
            return Err(ShareError::Failed(
                "no terminal to copy through; use --print".to_string(),
            ));
        }
        let mut out = std::io::stderr();
        out.write_all(osc52_sequence(text).as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| ShareError::Failed(e.to_string()))
    }
}

/// "Shares" by printing to stdout, for piping into other tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutShare;

#[async_trait]
impl ShareSheet for StdoutShare {
    async fn share(&self, _title: &str, text: &str) -> Result<(), ShareError> {
        let mut out = std::io::stdout();
        writeln!(out, "{}", text)
            .and_then(|()| out.flush())
            .map_err(|e| ShareError::Failed(e.to_string()))
    }
}
