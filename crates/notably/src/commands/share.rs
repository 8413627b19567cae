//! Share command - copy a note's title and summary.

use anyhow::Result;
use clap::Args;
use console::Style;
use notably_domain::{NoShareSheet, ShareOutcome, share_note};

use super::{Context, domain_failure};
use crate::clipboard::{Osc52Clipboard, StdoutShare};

/// Arguments for the share command.
#[derive(Args, Debug)]
pub struct ShareArgs {
    /// Note ID
    pub id: String,

    /// Print the shared text to stdout instead of copying it
    #[arg(long)]
    pub print: bool,
}

/// Run the share command.
pub async fn run(args: ShareArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open_store().await?;
    let note = session.require(&args.id)?;
    let clipboard = Osc52Clipboard::new();

    let outcome = if args.print {
        share_note(&note, &StdoutShare, &clipboard).await
    } else {
        share_note(&note, &NoShareSheet, &clipboard).await
    }
    .map_err(domain_failure)?;

    if ctx.json_output {
        let outcome = match outcome {
            ShareOutcome::Shared => "shared",
            ShareOutcome::Copied => "copied",
            ShareOutcome::Cancelled => "cancelled",
        };
        println!("{}", serde_json::json!({ "id": note.id, "outcome": outcome }));
    } else if let Some(message) = outcome.message() {
        println!("{} {}", Style::new().green().apply_to("✓"), message);
    } else if outcome == ShareOutcome::Cancelled {
        println!("{}", Style::new().dim().apply_to("Cancelled"));
    }

    session.finish().await
}
