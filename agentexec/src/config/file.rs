//! Reading and writing `~/.agentexec/config.ini`.
//!
//! Keys are parsed by [`super::parser`] and written by [`super::writer`];
//! this module only deals with paths and the filesystem.

use ini::Ini;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::settings::ConfigFile;

const CONFIG_DIR_NAME: &str = ".agentexec";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors from loading or saving an executor config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A key holds a value the executor cannot use.
    #[error("[{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("cannot create config directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigFile {
    /// Reads `~/.agentexec/config.ini`.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Reads `path`, overlaying its keys on the defaults. A missing file
    /// yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        match Ini::load_from_file(path) {
            Ok(ini) => super::parser::parse_ini(&ini),
            Err(ini::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file absent, executor defaults apply");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigFileError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes `~/.agentexec/config.ini`.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Writes the commented INI form of `self` to `path`.
    ///
    /// The content goes to a sibling `.tmp` file first and is renamed into
    /// place, so a reader never sees a half-written config.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ConfigFileError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let staging = path.with_extension("ini.tmp");
        let write_error = |source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        std::fs::write(&staging, super::writer::to_config_string(self)).map_err(write_error)?;
        std::fs::rename(&staging, path).map_err(write_error)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Writes the default config unless one exists, returning its path.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        Self::ensure_exists_at(&path)?;
        Ok(path)
    }

    /// Writes the default config to `path` unless a file is already there.
    /// Returns true if it was written.
    pub fn ensure_exists_at(path: &Path) -> Result<bool, ConfigFileError> {
        if path.is_file() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        info!(path = %path.display(), "Default config written");
        Ok(true)
    }
}

/// `~/.agentexec`, or `./.agentexec` without a home directory.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_LOG_FILE, DEFAULT_POLICY_TIMEOUT_SECS};

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.policy.timeout_secs, DEFAULT_POLICY_TIMEOUT_SECS);
        assert_eq!(config.logging.file, DEFAULT_LOG_FILE);
        assert!(config.logging.directory.ends_with(".agentexec/logs"));
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.executor.abandoned_cache_timeout_ms = 750;
        config.cache.sweep_interval_ms = 40;
        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ensure_exists_at_only_creates_once() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        assert!(ConfigFile::ensure_exists_at(&config_path).unwrap());
        std::fs::write(&config_path, "[policy]\ntimeout_secs = 9\n").unwrap();
        assert!(!ConfigFile::ensure_exists_at(&config_path).unwrap());

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded.policy.timeout_secs, 9);
    }

    #[test]
    fn test_unparseable_file_reports_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, "[cache\nsweep_interval_ms = 40\n").unwrap();

        match ConfigFile::load_from(&config_path) {
            Err(ConfigFileError::Read { path, .. }) => assert_eq!(path, config_path),
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn test_save_leaves_no_staging_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        ConfigFile::default().save_to(&config_path).unwrap();
        ConfigFile::default().save_to(&config_path).unwrap();

        let names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config.ini")]);
    }

    #[test]
    fn test_invalid_file_reports_value() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, "[cache]\nsweep_interval_ms = soon\n").unwrap();

        let err = ConfigFile::load_from(&config_path).unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }
}
