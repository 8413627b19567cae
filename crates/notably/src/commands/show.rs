//! Show command - a note with its rendered summary.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use notably_domain::{Note, SummaryLine, parse_summary};

use super::Context;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Note ID
    pub id: String,

    /// Also print the extracted source text
    #[arg(long)]
    pub content: bool,
}

/// Run the show command.
pub async fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open_store().await?;
    let note = session.require(&args.id)?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        print_note(&note);
        if args.content && !note.content.is_empty() {
            let dim = Style::new().dim();
            println!();
            println!("{}", style("Source text").bold());
            println!("{}", dim.apply_to("─".repeat(50)));
            println!("{}", note.content);
        }
    }

    session.finish().await
}

/// Header and styled summary for one note.
pub fn print_note(note: &Note) {
    let dim = Style::new().dim();

    println!("{}", style(&note.title).bold());
    println!(
        "{}",
        dim.apply_to(format!(
            "{} · {} · {} · {}",
            note.source_file_name,
            note.source_type.as_str(),
            note.format.label(),
            note.created_at.format("%Y-%m-%d %H:%M")
        ))
    );
    if let Some(instructions) = &note.custom_instructions {
        println!("{}", dim.apply_to(format!("Instructions: {}", instructions)));
    }
    println!("{}", dim.apply_to("─".repeat(50)));

    if note.is_awaiting_generation() {
        println!(
            "{}",
            dim.apply_to(format!(
                "Not generated yet. Run `notably generate {} --source <file>`.",
                note.id
            ))
        );
        return;
    }

    for line in parse_summary(&note.summary) {
        println!("{}", render_line(line));
    }
}

fn render_line(line: SummaryLine<'_>) -> String {
    match line {
        SummaryLine::Heading { level: 1, text } => style(text).bold().underlined().to_string(),
        SummaryLine::Heading { text, .. } => style(text).bold().to_string(),
        SummaryLine::Bullet { text } => format!("  {} {}", style("•").cyan(), text),
        SummaryLine::NestedBullet { text } => format!("      {} {}", style("◦").dim(), text),
        SummaryLine::Paragraph { text } => text.to_string(),
        SummaryLine::Spacer => String::new(),
    }
}
