//! depstage - idempotent dependency staging for native builds
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use depstage::cli::{commands, Cli, Commands};
use depstage::config::{ConfigManager, CONFIG_FILE_NAME};
use depstage::error::{StageError, StageResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> StageResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("depstage=warn"),
        1 => EnvFilter::new("depstage=info"),
        _ => EnvFilter::new("depstage=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Init command doesn't need config loading
    if let Commands::Init(args) = cli.command {
        return commands::init(args).await;
    }

    let cwd = std::env::current_dir().map_err(|e| StageError::io("getting current directory", e))?;
    let config_path = match cli.config {
        Some(path) => path,
        None => ConfigManager::find_local_config(&cwd)
            .ok_or_else(|| StageError::ConfigNotFound(cwd.join(CONFIG_FILE_NAME)))?,
    };
    debug!("Using config {}", config_path.display());

    let manager = ConfigManager::with_path(config_path);
    let project = manager.load_project().await?;

    match cli.command {
        Commands::Init(_) => unreachable!("Init handled above"),
        Commands::Stage(args) => commands::stage(args, &project).await,
        Commands::Status(args) => commands::status(args, &project).await,
        Commands::Run(args) => commands::run(args, &project).await,
        Commands::Tasks => commands::tasks(&project).await,
        Commands::Clean(args) => commands::clean(args, &project).await,
        Commands::Config(args) => commands::config(args, &manager, &project).await,
    }
}
