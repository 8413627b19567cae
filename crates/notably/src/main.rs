//! Notably - turn documents and photos into generated study notes
//!
//! Main entry point for the Notably CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod clipboard;
mod commands;

use commands::{add, config, delete, generate, list, revise, share, show};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Notably - turn documents and photos into generated study notes
#[derive(Parser)]
#[command(name = "notably")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a note from a file and generate it
    Add(add::AddArgs),

    /// List saved notes
    List(list::ListArgs),

    /// Show a note with its summary
    Show(show::ShowArgs),

    /// Run generation for a note again
    Generate(generate::GenerateArgs),

    /// Rewrite a note's summary with an instruction
    Revise(revise::ReviseArgs),

    /// Delete a note
    Delete(delete::DeleteArgs),

    /// Copy a note to the clipboard
    Share(share::ShareArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = notably_config::load_config(None)?;

    // Initialize tracing: console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "notably=debug,notably_domain=debug,notably_store=debug,notably_llm=debug,notably_config=debug,info"
    } else {
        "notably=warn,notably_domain=warn,notably_store=warn,notably_llm=warn,error"
    };

    let logging = loaded.config.logging();
    let _guard = {
        use tracing_subscriber::prelude::*;

        let file_layer = if logging.file {
            let log_dir = logging
                .directory
                .clone()
                .or_else(|| notably_config::user_config_dir().map(|d| d.join("logs")))
                .unwrap_or_else(|| std::path::PathBuf::from("logs"));
            let file_appender = tracing_appender::rolling::daily(&log_dir, "notably.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "notably=trace,notably_domain=trace,notably_store=trace,notably_llm=trace,notably_config=trace,info",
                ));
            Some((layer, guard))
        } else {
            None
        };
        let (file_layer, guard) = match file_layer {
            Some((layer, guard)) => (Some(layer), Some(guard)),
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .with_filter(tracing_subscriber::EnvFilter::new(filter)),
            )
            .with(file_layer)
            .init();
        guard
    };

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    // Create context for commands
    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config: loaded.config,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Add(args) => add::run(args, &ctx).await,
        Commands::List(args) => list::run(args, &ctx).await,
        Commands::Show(args) => show::run(args, &ctx).await,
        Commands::Generate(args) => generate::run(args, &ctx).await,
        Commands::Revise(args) => revise::run(args, &ctx).await,
        Commands::Delete(args) => delete::run(args, &ctx).await,
        Commands::Share(args) => share::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
