//! Generate command - run the generation pass for an existing note.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use notably_domain::PickedFile;

use super::{Context, domain_failure, with_live_text};
use crate::commands::show::print_note;

/// Arguments for the generate command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Note ID
    pub id: String,

    /// Source file to read. Needed after a restart, since the source handle
    /// is not saved.
    #[arg(short, long)]
    pub source: Option<PathBuf>,
}

/// Run the generate command.
pub async fn run(args: GenerateArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open_store().await?;
    let note = session.require(&args.id)?;
    let services = ctx.services(session.store.clone())?;
    let controller = services.controller(note.id.clone());

    if let Some(path) = &args.source {
        if !path.is_file() {
            bail!("No such file: {}", path.display());
        }
        let picked = PickedFile::from_path(&std::fs::canonicalize(path)?);
        controller
            .attach_source(picked.uri, picked.mime_type)
            .map_err(domain_failure)?;
    } else if !note.has_source() {
        bail!(
            "Note {} has no source attached; pass --source <file>",
            note.id
        );
    }

    let result = with_live_text(
        ctx,
        "Generating notes...",
        controller.streaming_text(),
        controller.generate(),
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
        println!("{} Generated: {}", green.apply_to("✓"), note.title);
        if ctx.verbose {
            println!();
            print_note(&note);
        }
    }

    session.finish().await
}
