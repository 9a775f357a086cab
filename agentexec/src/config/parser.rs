//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [executor] section
    if let Some(section) = ini.section(Some("executor")) {
        let s = "executor";
        if let Some(v) = positive(section, s, "inactivity_idle_secs", "seconds")? {
            config.executor.inactivity_idle_secs = v;
        }
        if let Some(v) = positive(section, s, "cleanup_interval_ms", "milliseconds")? {
            config.executor.cleanup_interval_ms = v;
        }
        // Zero is allowed: abandoned results are evicted on the next sweep.
        if let Some(v) = number(section, s, "abandoned_cache_timeout_ms", "milliseconds")? {
            config.executor.abandoned_cache_timeout_ms = v;
        }
    }

    // [scheduler] section
    if let Some(section) = ini.section(Some("scheduler")) {
        let s = "scheduler";
        if let Some(v) = positive(section, s, "max_simultaneous_jobs", "jobs")? {
            config.scheduler.max_simultaneous_jobs = v;
        }
        if let Some(v) = number(section, s, "high_speed_queue_threshold", "queued jobs")? {
            config.scheduler.high_speed_queue_threshold = v;
        }
        if let Some(v) = positive(section, s, "cleanup_interval_ms", "milliseconds")? {
            config.scheduler.cleanup_interval_ms = v;
        }
        if let Some(v) = positive(section, s, "high_speed_cleanup_interval_ms", "milliseconds")? {
            config.scheduler.high_speed_cleanup_interval_ms = v;
        }
        if let Some(v) = positive(section, s, "inactivity_idle_secs", "seconds")? {
            config.scheduler.inactivity_idle_secs = v;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = positive(section, "cache", "sweep_interval_ms", "milliseconds")? {
            config.cache.sweep_interval_ms = v;
        }
        if let Some(v) = positive(section, "cache", "inactivity_idle_secs", "seconds")? {
            config.cache.inactivity_idle_secs = v;
        }
    }

    // [policy] section
    if let Some(section) = ini.section(Some("policy")) {
        let s = "policy";
        if let Some(v) = positive(section, s, "timeout_secs", "seconds")? {
            config.policy.timeout_secs = v;
        }
        if let Some(v) = number(section, s, "max_cache_age_secs", "seconds")? {
            config.policy.max_cache_age_secs = v;
        }
        if let Some(v) = positive(section, s, "parallel_callback_timeout_secs", "seconds")? {
            config.policy.parallel_callback_timeout_secs = v;
        }
        if let Some(v) = section.get("priority") {
            config.policy.priority = v.parse().map_err(|_| ConfigFileError::InvalidValue {
                section: s.to_string(),
                key: "priority".to_string(),
                value: v.to_string(),
                reason: "must be one of: immediate, high, normal, low".to_string(),
            })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Reads an optional non-negative integer.
fn number<T: FromStr>(
    section: &Properties,
    name: &str,
    key: &str,
    unit: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    v.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigFileError::InvalidValue {
            section: name.to_string(),
            key: key.to_string(),
            value: v.to_string(),
            reason: format!("must be a non-negative integer ({})", unit),
        })
}

/// Reads an optional integer that must be greater than zero.
fn positive<T: FromStr + Default + PartialEq>(
    section: &Properties,
    name: &str,
    key: &str,
    unit: &str,
) -> Result<Option<T>, ConfigFileError> {
    match number::<T>(section, name, key, unit)? {
        Some(v) if v == T::default() => Err(ConfigFileError::InvalidValue {
            section: name.to_string(),
            key: key.to_string(),
            value: section.get(key).unwrap_or_default().to_string(),
            reason: format!("must be a positive integer ({})", unit),
        }),
        other => Ok(other),
    }
}

/// Expand `~` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_SIMULTANEOUS_JOBS;
    use crate::scheduler::JobPriority;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_partial_config() {
        let config = parse(
            r#"
[executor]
abandoned_cache_timeout_ms = 2000

[policy]
priority = High
max_cache_age_secs = 0
"#,
        )
        .unwrap();

        assert_eq!(config.executor.abandoned_cache_timeout_ms, 2000);
        assert_eq!(config.policy.priority, JobPriority::High);
        assert_eq!(config.policy.max_cache_age_secs, 0);
        assert_eq!(
            config.scheduler.max_simultaneous_jobs,
            DEFAULT_MAX_SIMULTANEOUS_JOBS
        );
    }

    #[test]
    fn test_invalid_number() {
        let err = parse("[scheduler]\nmax_simultaneous_jobs = lots\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue {
                section, key, value, ..
            } => {
                assert_eq!(section, "scheduler");
                assert_eq!(key, "max_simultaneous_jobs");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_rejected_where_positive_required() {
        let err = parse("[executor]\ncleanup_interval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("executor.cleanup_interval_ms"));
    }

    #[test]
    fn test_invalid_priority() {
        let err = parse("[policy]\npriority = urgent\n").unwrap_err();
        assert!(err.to_string().contains("immediate, high, normal, low"));
    }

    #[test]
    fn test_logging_section() {
        let config = parse("[logging]\ndirectory = /var/log/agents\nfile = run.log\n").unwrap();
        assert_eq!(config.logging.directory, PathBuf::from("/var/log/agents"));
        assert_eq!(config.logging.file, "run.log");

        let config = parse("[logging]\ndirectory =\n").unwrap();
        assert_eq!(config.logging, ConfigFile::default().logging);
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_tilde("~/logs"), home.join("logs"));
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("/tmp/logs"), PathBuf::from("/tmp/logs"));
    }
}
