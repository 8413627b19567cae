//! Delete command - remove a note.

use anyhow::Result;
use clap::Args;
use console::{Style, Term};
use notably_store::Note;

use super::Context;

/// Arguments for the delete command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Note ID
    pub id: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Run the delete command.
pub async fn run(args: DeleteArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open_store().await?;
    let note = session.require(&args.id)?;

    if !args.yes && !confirm(&note)? {
        println!("{}", Style::new().dim().apply_to("Cancelled"));
        return session.finish().await;
    }

    let removed = session.store.delete_note(&note.id);
    if ctx.json_output {
        println!("{}", serde_json::json!({ "id": note.id, "deleted": removed }));
    } else {
        let green = Style::new().green();
        println!("{} Deleted: {}", green.apply_to("✓"), note.title);
    }

    session.finish().await
}

/// Ask before deleting. A non-interactive terminal counts as "no".
fn confirm(note: &Note) -> Result<bool> {
    let term = Term::stderr();
    if !term.is_term() {
        return Ok(false);
    }
    term.write_str(&format!(
        "Delete \"{}\"? This cannot be undone. [y/N] ",
        note.title
    ))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
