//! User configuration for the agent executor.
//!
//! Settings live in an INI file, by default `~/.agentexec/config.ini`:
//!
//! ```text
//! [executor]   cleanup cadence, idle shutdown, abandoned cache timeout
//! [scheduler]  worker limit, high-speed cleanup thresholds
//! [cache]      result cache sweep interval
//! [policy]     defaults applied to requests built without explicit values
//! [logging]    log directory and file name
//! ```
//!
//! Missing sections and keys fall back to the `DEFAULT_*` constants, so an
//! empty or absent file yields [`ConfigFile::default()`]. Runtime types are
//! built from the file with `From<&ConfigFile>` conversions, for example
//! [`ExecutorConfig`](crate::executor::ExecutorConfig).
//!
//! # Example
//!
//! ```no_run
//! use agentexec::config::ConfigFile;
//! use agentexec::executor::ExecutorConfig;
//!
//! let file = ConfigFile::load()?;
//! let config = ExecutorConfig::from(&file);
//! # Ok::<(), agentexec::config::ConfigFileError>(())
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::*;
