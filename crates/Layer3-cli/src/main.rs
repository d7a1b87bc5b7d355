//! vai CLI - Main entry point

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vai_foundation::VaiConfig;

/// vai - keeps condensed outlines of workspace source files for model context
#[derive(Parser, Debug)]
#[command(name = "vai")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Workspace root (defaults to the current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Log level (overrides config; RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Shell command that reads a file on stdin and prints its synopsis
    #[arg(long, global = true)]
    summarizer_cmd: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Track files or directories without regenerating
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Stop tracking files or directories
    Remove {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Regenerate synopses of files or directories whose content changed
    Map {
        /// Files or directories (defaults to the whole workspace)
        paths: Vec<PathBuf>,
    },
    /// Regenerate every outdated synopsis and drop deleted files
    Refresh,
    /// Show tracked files and whether their synopsis is current
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the synopsis digest
    Render {
        /// Restrict to these files or directories
        paths: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let workspace = match &args.workspace {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    // Load configuration
    let mut config = VaiConfig::load(&workspace).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        VaiConfig::new()
    });
    if let Some(level) = &args.log_level {
        config.log_level = Some(level.clone());
    }
    if let Some(command) = &args.summarizer_cmd {
        config.mapper.summarizer_command = Some(command.clone());
    }

    // Initialize logging (stdout is reserved for command output)
    let log_level = config.log_level.clone().unwrap_or_else(|| "warn".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cache = commands::open_cache(&workspace, &config)?;

    match args.command {
        Command::Add { paths } => commands::add(&cache, &paths),
        Command::Remove { paths } => commands::remove(&cache, &paths),
        Command::Map { paths } => {
            commands::require_summarizer(&config)?;
            commands::map(&cache, &paths).await
        }
        Command::Refresh => {
            commands::require_summarizer(&config)?;
            commands::refresh(&cache).await
        }
        Command::Status { json } => commands::status(&cache, json),
        Command::Render { paths } => commands::render(&cache, &paths),
    }
}
