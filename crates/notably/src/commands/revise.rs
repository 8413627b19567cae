//! Revise command - rewrite a note's summary with an instruction.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::{Context, domain_failure, with_live_text};

/// Arguments for the revise command.
#[derive(Args, Debug)]
pub struct ReviseArgs {
    /// Note ID
    pub id: String,

    /// What to change (e.g. "make it shorter")
    #[arg(required = true, num_args = 1..)]
    pub instruction: Vec<String>,
}

/// Run the revise command.
pub async fn run(args: ReviseArgs, ctx: &Context) -> Result<()> {
    let instruction = args.instruction.join(" ");

    let session = ctx.open_store().await?;
    let note = session.require(&args.id)?;
    let services = ctx.services(session.store.clone())?;
    let controller = services.controller(note.id);

    let result = with_live_text(
        ctx,
        "Updating note...",
        controller.streaming_text(),
        controller.revise(&instruction),
    )
    .await;
    let note = match result {
        Ok(note) => note,
        Err(e) => {
            session.finish().await?;
            return Err(domain_failure(e));
        }
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        let green = Style::new().green();
        println!("{} Note updated", green.apply_to("✓"));
    }

    session.finish().await
}
