//! Configuration management CLI commands.

use agentexec::config::ConfigFile;
use clap::Subcommand;
use std::path::Path;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against the file at `path`.
pub fn run(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(path),
        ConfigCommands::Init { force } => run_init(path, force),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;

    println!("# {}", path.display());
    println!("[executor]");
    println!("inactivity_idle_secs = {}", config.executor.inactivity_idle_secs);
    println!("cleanup_interval_ms = {}", config.executor.cleanup_interval_ms);
    println!(
        "abandoned_cache_timeout_ms = {}",
        config.executor.abandoned_cache_timeout_ms
    );
    println!("[scheduler]");
    println!("max_simultaneous_jobs = {}", config.scheduler.max_simultaneous_jobs);
    println!(
        "high_speed_queue_threshold = {}",
        config.scheduler.high_speed_queue_threshold
    );
    println!("cleanup_interval_ms = {}", config.scheduler.cleanup_interval_ms);
    println!(
        "high_speed_cleanup_interval_ms = {}",
        config.scheduler.high_speed_cleanup_interval_ms
    );
    println!("inactivity_idle_secs = {}", config.scheduler.inactivity_idle_secs);
    println!("[cache]");
    println!("sweep_interval_ms = {}", config.cache.sweep_interval_ms);
    println!("inactivity_idle_secs = {}", config.cache.inactivity_idle_secs);
    println!("[policy]");
    println!("timeout_secs = {}", config.policy.timeout_secs);
    println!("max_cache_age_secs = {}", config.policy.max_cache_age_secs);
    println!(
        "parallel_callback_timeout_secs = {}",
        config.policy.parallel_callback_timeout_secs
    );
    println!("priority = {}", config.policy.priority);
    println!("[logging]");
    println!("directory = {}", config.logging.directory.display());
    println!("file = {}", config.logging.file);
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if force {
        ConfigFile::default().save_to(path)?;
        println!("Wrote default configuration to {}", path.display());
    } else if ConfigFile::ensure_exists_at(path)? {
        println!("Created {}", path.display());
    } else {
        println!("{} already exists (use --force to overwrite)", path.display());
    }
    Ok(())
}
