//! List command - saved notes, newest first.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;

/// Arguments for the list command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum notes to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

/// Run the list command.
pub async fn run(args: ListArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open_store().await?;
    let notes = session.store.notes();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return session.finish().await;
    }

    let dim = Style::new().dim();
    println!("{}", style("Notes").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!();

    if notes.is_empty() {
        println!("{}", dim.apply_to("No notes yet"));
    } else {
        for note in notes.iter().take(args.limit) {
            let title = if note.is_awaiting_generation() {
                style(note.title.as_str()).yellow().to_string()
            } else {
                truncate(&note.title, 50)
            };
            println!(
                "{} {} {}",
                dim.apply_to(format!("[{}]", note.id)),
                title,
                dim.apply_to(format!(
                    "({}, {})",
                    note.source_file_name,
                    note.created_at.format("%Y-%m-%d")
                )),
            );
        }
        if notes.len() > args.limit {
            println!();
            println!(
                "{}",
                dim.apply_to(format!("... and {} more", notes.len() - args.limit))
            );
        }
    }

    session.finish().await
}

fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line\nbreak", 20), "line break");
        assert_eq!(truncate("ééééééééé", 6), "ééé...");
    }
}
