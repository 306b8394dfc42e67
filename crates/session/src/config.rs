use std::time::Duration;

use lpgen_core::config::env_parse;
use lpgen_core::CoreError;

/// Default delay between status requests in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Default number of consecutive failed status requests before giving up.
pub const DEFAULT_MAX_FAILURES: u32 = 5;

/// Default upper bound on how long a job is followed, in seconds.
pub const DEFAULT_MAX_DURATION_SECS: u64 = 600;

/// Status polling configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between status requests (default: 3 seconds).
    pub interval: Duration,
    /// Consecutive failures tolerated before the poll surfaces an error.
    /// `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
    /// Time without a terminal status before the poll surfaces a timeout.
    /// `None` waits forever.
    pub max_duration: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_consecutive_failures: Some(DEFAULT_MAX_FAILURES),
            max_duration: Some(Duration::from_secs(DEFAULT_MAX_DURATION_SECS)),
        }
    }
}

impl PollConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default | Notes          |
    /// |--------------------------|---------|----------------|
    /// | `POLL_INTERVAL_MS`       | `3000`  | must be > 0    |
    /// | `POLL_MAX_FAILURES`      | `5`     | `0` disables   |
    /// | `POLL_MAX_DURATION_SECS` | `600`   | `0` disables   |
    pub fn from_env() -> Result<Self, CoreError> {
        let interval_ms: u64 = env_parse("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if interval_ms == 0 {
            return Err(CoreError::Validation(
                "POLL_INTERVAL_MS must be greater than 0".into(),
            ));
        }

        let max_failures: u32 = env_parse("POLL_MAX_FAILURES", DEFAULT_MAX_FAILURES)?;
        let max_duration_secs: u64 =
            env_parse("POLL_MAX_DURATION_SECS", DEFAULT_MAX_DURATION_SECS)?;

        Ok(Self {
            interval: Duration::from_millis(interval_ms),
            max_consecutive_failures: (max_failures > 0).then_some(max_failures),
            max_duration: (max_duration_secs > 0).then(|| Duration::from_secs(max_duration_secs)),
        })
    }
}
