//! Add command - create a note from a file.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use notably_domain::{NoteFormat, PickedFile, SourceType, UploadOptions};

use super::{Context, domain_failure, with_live_text};
use crate::commands::show::print_note;

/// Arguments for the add command.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Document or image to take notes from
    pub path: PathBuf,

    /// Summary style: paragraph, bullet-points, or outline
    #[arg(short, long, default_value = "bullet-points")]
    pub format: NoteFormat,

    /// Extra guidance for the summary (e.g. "focus on dates")
    #[arg(short, long)]
    pub instructions: Option<String>,

    /// Treat the file as a camera photo
    #[arg(long)]
    pub photo: bool,

    /// Only create the draft; generate later with `notably generate`
    #[arg(long)]
    pub no_generate: bool,
}

/// Run the add command.
pub async fn run(args: AddArgs, ctx: &Context) -> Result<()> {
    if !args.path.is_file() {
        bail!("No such file: {}", args.path.display());
    }
    let path = std::fs::canonicalize(&args.path)?;

    let mut options = UploadOptions::new(args.format);
    if args.photo {
        options = options.with_source_type(SourceType::Photo);
    }
    if let Some(instructions) = &args.instructions {
        options = options.with_instructions(instructions.as_str());
    }

    let session = ctx.open_store().await?;

    // Resolve the backend before creating anything so a missing key does not
    // leave a draft behind.
    let services = if args.no_generate {
        None
    } else {
        Some(ctx.services(session.store.clone())?)
    };

    let picked = PickedFile::from_path(&path);
    let draft = match notably_domain::upload::create_note(&session.store, Some(picked), &options) {
        Ok(Some(note)) => note,
        Ok(None) => bail!("No file selected"),
        Err(e) => return Err(domain_failure(e)),
    };

    let note = match services {
        None => draft,
        Some(services) => {
            let controller = services.controller(draft.id.clone());
            let result = with_live_text(
                ctx,
                "Generating notes...",
                controller.streaming_text(),
                controller.open(),
            )
            .await;
            if let Err(e) = result {
                session.finish().await?;
                return Err(domain_failure(e));
            }
            controller.note().unwrap_or(draft)
        }
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        let green = Style::new().green();
        let dim = Style::new().dim();
        println!(
            "{} Note created: {}",
            green.apply_to("✓"),
            dim.apply_to(&note.id)
        );
        if ctx.verbose && !note.is_awaiting_generation() {
            println!();
            print_note(&note);
        }
    }

    session.finish().await
}
