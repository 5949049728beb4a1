use super::parse_duration_string;
use crate::error::{Error, Result};
use std::time::Duration;

/// Interval between readiness polls, for both dependency and self checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for `docker run` (includes an implicit image pull).
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound for short engine commands (`rm`, `inspect`, `info`).
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for a single readiness attempt of the bundled checkers.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Label attached to every container the harness launches.
pub const DEFAULT_LABEL: &str = "com.service-harness.managed=true";

/// Tunables shared by the engine, the checkers and the container handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub poll_interval: Duration,
    pub launch_timeout: Duration,
    pub command_timeout: Duration,
    pub attempt_timeout: Duration,
    pub label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl Settings {
    /// Defaults overridden by `HARNESS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `HARNESS_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        let duration = |key: &str, current: Duration| -> Result<Duration> {
            match lookup(key) {
                None => Ok(current),
                Some(raw) => parse_duration_string(&raw).ok_or_else(|| {
                    Error::Config(format!("{}: invalid duration '{}'", key, raw))
                }),
            }
        };

        settings.poll_interval = duration("HARNESS_POLL_INTERVAL", settings.poll_interval)?;
        settings.launch_timeout = duration("HARNESS_LAUNCH_TIMEOUT", settings.launch_timeout)?;
        settings.command_timeout = duration("HARNESS_COMMAND_TIMEOUT", settings.command_timeout)?;
        settings.attempt_timeout = duration("HARNESS_ATTEMPT_TIMEOUT", settings.attempt_timeout)?;

        if settings.poll_interval.is_zero() {
            return Err(Error::Config(
                "HARNESS_POLL_INTERVAL must be greater than zero".to_string(),
            ));
        }

        if let Some(label) = lookup("HARNESS_LABEL") {
            if !label.contains('=') {
                return Err(Error::Config(format!(
                    "HARNESS_LABEL: expected key=value, got '{}'",
                    label
                )));
            }
            settings.label = label;
        }

        Ok(settings)
    }

    /// The `key=value` label as a `docker ps --filter` expression.
    pub fn label_filter(&self) -> String {
        format!("label={}", self.label)
    }
}
