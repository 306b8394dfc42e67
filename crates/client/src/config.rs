use std::time::Duration;

use lpgen_core::config::{env_or, env_parse};
use lpgen_core::CoreError;

/// Default API base URL for a locally running backend.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL without a trailing slash, e.g. `http://host:8000/api`.
    pub api_url: String,
    /// Per-request timeout (default: `30` seconds).
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                     |
    /// |------------------------|-----------------------------|
    /// | `LPGEN_API_URL`        | `http://localhost:8000/api` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                        |
    pub fn from_env() -> Result<Self, CoreError> {
        let api_url = normalize_base_url(&env_or("LPGEN_API_URL", DEFAULT_API_URL));
        if api_url.is_empty() {
            return Err(CoreError::Validation("LPGEN_API_URL must not be empty".into()));
        }

        let request_timeout_secs: u64 =
            env_parse("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        Ok(Self {
            api_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    /// Override the base URL, e.g. from a command-line flag.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = normalize_base_url(api_url);
        self
    }
}

/// Strip whitespace and trailing slashes so paths can be appended with
/// `format!("{base}/jobs")`.
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_removed() {
        let config = ClientConfig::default().with_api_url(" http://api.example.com/api// ");
        assert_eq!(config.api_url, "http://api.example.com/api");
    }

    #[test]
    fn default_points_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
