use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

mod commands;
mod runtime;

use commands::{cmd_run, cmd_validate, RunArgs, ValidateArgs};
use runtime::{init_logging, load_config};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one action command against a page fixture
    Run(RunArgs),

    /// Parse an action command and list the selectors it needs
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_json)?;
    info!("Starting action-driver v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Run(args) => match load_config(cli.config.as_ref()) {
            Ok(loaded) => {
                debug!(path = %loaded.path.display(), "Resolved configuration path");
                cmd_run(args, &loaded.config).await
            }
            Err(err) => Err(err),
        },
        Commands::Validate(args) => cmd_validate(args).await,
    };

    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}
