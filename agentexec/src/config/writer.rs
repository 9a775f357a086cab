//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[executor]
; Seconds without started agents or pending requests before the
; executor's cleanup ticker stops (default: 120)
inactivity_idle_secs = {}
; Interval in milliseconds between request deadline and agent
; timeout checks (default: 250)
cleanup_interval_ms = {}
; How long a cached result is kept after the last caller holding
; a tether for it lets go, in milliseconds (default: 500)
abandoned_cache_timeout_ms = {}

[scheduler]
; Maximum number of agent jobs running at the same time (default: 10)
max_simultaneous_jobs = {}
; Queue length above which overdue jobs are checked more often (default: 20)
high_speed_queue_threshold = {}
; Overdue job check interval in milliseconds (default: 100)
cleanup_interval_ms = {}
; Overdue job check interval while the queue is long (default: 5)
high_speed_cleanup_interval_ms = {}
; Seconds without queued jobs before the check stops (default: 120)
inactivity_idle_secs = {}

[cache]
; Interval in milliseconds between expired result sweeps (default: 250)
sweep_interval_ms = {}
; Seconds with an empty cache before sweeping stops (default: 30)
inactivity_idle_secs = {}

[policy]
; Defaults for requests that do not set their own values.
; Seconds before an unanswered request receives an empty result (default: 300)
timeout_secs = {}
; Seconds a result may be served from the cache; 0 disables caching (default: 120)
max_cache_age_secs = {}
; Seconds a listener may run when delivered in parallel (default: 360)
parallel_callback_timeout_secs = {}
; Scheduling priority: immediate, high, normal or low (default: normal)
priority = {}

[logging]
; Directory for log files (default: ~/.agentexec/logs)
directory = {}
; Log file name, truncated at startup (default: agentexec.log)
file = {}
"#,
        config.executor.inactivity_idle_secs,
        config.executor.cleanup_interval_ms,
        config.executor.abandoned_cache_timeout_ms,
        config.scheduler.max_simultaneous_jobs,
        config.scheduler.high_speed_queue_threshold,
        config.scheduler.cleanup_interval_ms,
        config.scheduler.high_speed_cleanup_interval_ms,
        config.scheduler.inactivity_idle_secs,
        config.cache.sweep_interval_ms,
        config.cache.inactivity_idle_secs,
        config.policy.timeout_secs,
        config.policy.max_cache_age_secs,
        config.policy.parallel_callback_timeout_secs,
        config.policy.priority,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::JobPriority;
    use ini::Ini;

    #[test]
    fn test_written_file_parses_back() {
        let mut config = ConfigFile::default();
        config.scheduler.max_simultaneous_jobs = 3;
        config.policy.priority = JobPriority::Low;
        config.logging.file = "custom.log".to_string();

        let ini = Ini::load_from_str(&to_config_string(&config)).unwrap();
        let parsed = super::super::parser::parse_ini(&ini).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_every_section_present() {
        let content = to_config_string(&ConfigFile::default());
        for section in ["[executor]", "[scheduler]", "[cache]", "[policy]", "[logging]"] {
            assert!(content.contains(section), "missing {section}");
        }
        assert!(content.contains("priority = normal"));
    }
}
