//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};

use notably_config::{self, NotablyConfig, PROJECT_CONFIG_FILE, resolve_api_key};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./notably.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx).await,
        ConfigCommand::Which => cmd_which().await,
        ConfigCommand::Init { local } => cmd_init(local).await,
        ConfigCommand::Path => cmd_path().await,
    }
}

async fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = notably_config::load_config(None)?;
    let config = &loaded.config;
    let llm = config.llm();
    let storage = config.storage();
    let logging = config.logging();
    let backend = llm.effective_backend();
    let key = resolve_api_key(&backend, llm.api_key.as_deref());

    if ctx.json_output {
        let value = serde_json::json!({
            "sources": loaded.loaded_from(),
            "llm": {
                "backend": backend.display_name(),
                "model": llm.effective_model(),
                "base_url": llm.base_url,
                "max_tokens": llm.effective_max_tokens()?,
                "timeout_secs": llm.effective_timeout().as_secs(),
                "api_key_source": key.as_ref().map(|k| k.source.to_string()),
            },
            "storage": {
                "data_dir": storage.effective_data_dir()?,
                "notes_key": storage.effective_notes_key(),
                "content_limit": storage.effective_content_limit(),
            },
            "warnings": loaded.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("# Notably Configuration\n");

    // Sources
    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let key_status = match &key {
        Some(secret) => format!("[key: {}]", secret.source),
        None => format!("[no key, set {}]", backend.env_var()),
    };
    println!("LLM:");
    println!("  {} / {}  {}", backend, llm.effective_model(), key_status);
    if let Some(ref url) = llm.base_url {
        println!("  base_url: {}", url);
    }
    println!("  max_tokens: {}", llm.effective_max_tokens()?);
    println!("  timeout: {}s", llm.effective_timeout().as_secs());
    println!();

    println!("Storage:");
    println!("  data_dir: {}", storage.effective_data_dir()?.display());
    println!("  notes_key: {}", storage.effective_notes_key());
    println!("  content_limit: {} chars", storage.effective_content_limit());
    println!();

    println!("Logging:");
    if logging.file {
        match &logging.directory {
            Some(dir) => println!("  file: {}", dir.display()),
            None => println!("  file: <config dir>/logs"),
        }
    } else {
        println!("  file: off");
    }
    println!();

    // Warnings
    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

async fn cmd_which() -> Result<()> {
    let loaded = notably_config::load_config(None)?;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'notably config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

async fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        std::path::PathBuf::from(PROJECT_CONFIG_FILE)
    } else {
        notably_config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    notably_config::save_config(&NotablyConfig::starter(), &path)?;
    println!("✓ Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  export ANTHROPIC_API_KEY=...    # API key for generation");
    println!("  notably config show             # verify configuration");
    println!("  notably add lecture.pdf         # create your first note");

    Ok(())
}

async fn cmd_path() -> Result<()> {
    if let Some(path) = notably_config::user_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}
