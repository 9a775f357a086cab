//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use agentexec::config::ConfigFileError;
use agentexec::ExecutorError;
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Failed to load or save the configuration file
    Config(ConfigFileError),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Failed to create the async runtime
    Runtime(std::io::Error),
    /// Executor rejected a request
    Executor(ExecutorError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Config(ConfigFileError::InvalidValue { .. }) = self {
            eprintln!();
            eprintln!("Fix the value in the config file, or regenerate it with:");
            eprintln!("  agentexec config init --force");
        }

        let code = match self {
            CliError::InvalidArgument(_) => 2,
            _ => 1,
        };
        process::exit(code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Executor(e) => write!(f, "Executor error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Executor(e) => Some(e),
            CliError::InvalidArgument(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<ExecutorError> for CliError {
    fn from(e: ExecutorError) -> Self {
        CliError::Executor(e)
    }
}
