//! Agent configuration.

use rollcall_core::constants::{
    CAPTURE_POLL_INTERVAL_MS, CPUINFO_PATH, DEFAULT_CREDENTIALS_FILE,
    DEFAULT_ENROLL_PAUSE_SECS, DEFAULT_ENROLL_STEP_TIMEOUT_SECS,
    DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_MATCH_THRESHOLD, DEFAULT_POWER_DELAY_SECS,
    DEFAULT_TEMPLATES_DIR, IDLE_SCAN_INTERVAL_MS, MATCH_COOLDOWN_SECS, TEMP_REPORT_THRESHOLD,
    THERMAL_ZONE_PATH,
};
use std::path::PathBuf;
use std::time::Duration;

/// Every tunable of the agent in one place.
///
/// `Default` carries the production values; tests shrink the timings
/// through the `with_*` builders.
///
/// # Examples
///
/// ```
/// use rollcall_agent::AgentConfig;
/// use std::time::Duration;
///
/// let config = AgentConfig::default()
///     .with_heartbeat_interval(Duration::from_secs(10))
///     .with_templates_dir("/var/lib/rollcall/templates");
/// assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Interval between health snapshot writes.
    pub heartbeat_interval: Duration,

    /// Minimum CPU temperature movement that warrants a report.
    pub temp_report_threshold: f64,

    /// Minimum comparison score accepted as a match.
    pub match_threshold: u16,

    /// Verification tick interval while idle.
    pub idle_scan_interval: Duration,

    /// Pause after a successful match before scanning resumes.
    pub match_cooldown: Duration,

    /// Poll interval inside the enrollment busy-waits.
    pub capture_poll_interval: Duration,

    /// Upper bound on each enrollment wait step.
    pub enroll_step_timeout: Duration,

    /// Grace period after asking the user to lift their finger.
    pub enroll_pause: Duration,

    /// Delay between acknowledging a power command and invoking it.
    pub power_delay: Duration,

    /// Directory of local template files.
    pub templates_dir: PathBuf,

    /// Path of the remote store credential file.
    pub credentials_path: PathBuf,

    /// Path of the kernel file carrying the board serial.
    pub cpuinfo_path: PathBuf,

    /// Path of the kernel thermal zone file.
    pub thermal_path: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            temp_report_threshold: TEMP_REPORT_THRESHOLD,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            idle_scan_interval: Duration::from_millis(IDLE_SCAN_INTERVAL_MS),
            match_cooldown: Duration::from_secs(MATCH_COOLDOWN_SECS),
            capture_poll_interval: Duration::from_millis(CAPTURE_POLL_INTERVAL_MS),
            enroll_step_timeout: Duration::from_secs(DEFAULT_ENROLL_STEP_TIMEOUT_SECS),
            enroll_pause: Duration::from_secs(DEFAULT_ENROLL_PAUSE_SECS),
            power_delay: Duration::from_secs(DEFAULT_POWER_DELAY_SECS),
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            cpuinfo_path: PathBuf::from(CPUINFO_PATH),
            thermal_path: PathBuf::from(THERMAL_ZONE_PATH),
        }
    }
}

impl AgentConfig {
    /// Set the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the temperature report threshold.
    #[must_use]
    pub fn with_temp_report_threshold(mut self, threshold: f64) -> Self {
        self.temp_report_threshold = threshold;
        self
    }

    /// Set the match score threshold.
    #[must_use]
    pub fn with_match_threshold(mut self, threshold: u16) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Set the idle verification tick interval.
    #[must_use]
    pub fn with_idle_scan_interval(mut self, interval: Duration) -> Self {
        self.idle_scan_interval = interval;
        self
    }

    /// Set the post-match cooldown.
    #[must_use]
    pub fn with_match_cooldown(mut self, cooldown: Duration) -> Self {
        self.match_cooldown = cooldown;
        self
    }

    /// Set the busy-wait poll interval.
    #[must_use]
    pub fn with_capture_poll_interval(mut self, interval: Duration) -> Self {
        self.capture_poll_interval = interval;
        self
    }

    /// Set the enrollment step timeout.
    #[must_use]
    pub fn with_enroll_step_timeout(mut self, timeout: Duration) -> Self {
        self.enroll_step_timeout = timeout;
        self
    }

    /// Set the pause between enrollment captures.
    #[must_use]
    pub fn with_enroll_pause(mut self, pause: Duration) -> Self {
        self.enroll_pause = pause;
        self
    }

    /// Set the power action delay.
    #[must_use]
    pub fn with_power_delay(mut self, delay: Duration) -> Self {
        self.power_delay = delay;
        self
    }

    /// Set the template directory.
    #[must_use]
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = dir.into();
        self
    }

    /// Set the credential file path.
    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    /// Set the cpuinfo path.
    #[must_use]
    pub fn with_cpuinfo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cpuinfo_path = path.into();
        self
    }

    /// Set the thermal zone path.
    #[must_use]
    pub fn with_thermal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.thermal_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.temp_report_threshold, 0.5);
        assert_eq!(config.match_threshold, 50);
        assert_eq!(config.idle_scan_interval, Duration::from_millis(500));
        assert_eq!(config.match_cooldown, Duration::from_secs(5));
        assert_eq!(config.power_delay, Duration::from_secs(3));
        assert_eq!(config.templates_dir, PathBuf::from("fingerprint_templates"));
    }

    #[test]
    fn test_builders() {
        let config = AgentConfig::default()
            .with_match_threshold(70)
            .with_power_delay(Duration::from_millis(10))
            .with_templates_dir("/tmp/t")
            .with_cpuinfo_path("/tmp/cpuinfo");
        assert_eq!(config.match_threshold, 70);
        assert_eq!(config.power_delay, Duration::from_millis(10));
        assert_eq!(config.templates_dir, PathBuf::from("/tmp/t"));
        assert_eq!(config.cpuinfo_path, PathBuf::from("/tmp/cpuinfo"));
    }
}
