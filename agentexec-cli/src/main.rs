//! agentexec CLI - command-line front end for the agent executor.

mod commands;
mod error;

use agentexec::config::{config_file_path, ConfigFile};
use agentexec::logging::{init_logging, LoggingGuard};
use agentexec::JobPriority;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use commands::config::ConfigCommands;
use commands::demo::DemoArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "agentexec")]
#[command(version = agentexec::VERSION)]
#[command(about = "Coalescing, caching executor for asynchronous agents", long_about = None)]
struct Cli {
    /// Config file (default: ~/.agentexec/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log directory (overrides [logging] directory)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run coalesced, cached and cancelled agents and print executor statistics
    Demo {
        /// Number of listeners requesting the same agent
        #[arg(long, default_value = "8")]
        listeners: usize,

        /// Simulated work per run, in milliseconds
        #[arg(long, default_value = "400")]
        work_ms: u64,

        /// Scheduling priority: immediate, high, normal or low
        #[arg(long, default_value = "normal")]
        priority: JobPriority,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.unwrap_or_else(config_file_path);

    match cli.command {
        Commands::Config(command) => commands::config::run(command, &config_path),
        Commands::Demo {
            listeners,
            work_ms,
            priority,
        } => {
            let config = ConfigFile::load_from(&config_path)?;
            let _guard = start_logging(&config, cli.log_dir)?;
            tracing::info!(version = agentexec::VERSION, "agentexec demo starting");

            commands::demo::run(
                DemoArgs {
                    listeners,
                    work: Duration::from_millis(work_ms),
                    priority,
                },
                &config,
            )
        }
    }
}

fn start_logging(config: &ConfigFile, log_dir: Option<PathBuf>) -> Result<LoggingGuard, CliError> {
    let dir = log_dir.unwrap_or_else(|| config.logging.directory.clone());
    init_logging(&dir, &config.logging.file).map_err(CliError::LoggingInit)
}
