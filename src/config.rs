use std::time::Duration;

use crate::sandbox::SandboxError;

pub const DEFAULT_SERVER_URL: &str = "https://app.daytona.io/api";
pub const DEFAULT_TARGET: &str = "us";
pub const DEFAULT_SANDBOX_IMAGE: &str = "whitezxj/sandbox:0.1.0";
pub const DEFAULT_VNC_PASSWORD: &str = "123456";

const DEFAULT_START_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub server_url: String,
    pub target: String,
    pub sandbox_image: String,
    pub vnc_password: String,
    pub start_timeout: Duration,
    pub poll_interval: Duration,
    pub sentry_dsn: Option<String>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, SandboxError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a Config from a variable lookup.
    /// Used directly in tests to avoid mutating process-global environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SandboxError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var("DAYTONA_API_KEY").ok_or_else(|| {
            SandboxError::Configuration(
                "DAYTONA_API_KEY environment variable is required".to_string(),
            )
        })?;

        let start_timeout = var("SANDBOX_START_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_START_TIMEOUT_SECS);
        let poll_interval = var("SANDBOX_POLL_INTERVAL_MS")
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        Ok(Config {
            api_key,
            server_url: var("DAYTONA_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            target: var("DAYTONA_TARGET").unwrap_or_else(|| DEFAULT_TARGET.to_string()),
            sandbox_image: var("DAYTONA_SANDBOX_IMAGE")
                .unwrap_or_else(|| DEFAULT_SANDBOX_IMAGE.to_string()),
            vnc_password: var("DAYTONA_VNC_PASSWORD")
                .unwrap_or_else(|| DEFAULT_VNC_PASSWORD.to_string()),
            start_timeout: Duration::from_secs(start_timeout),
            poll_interval: Duration::from_millis(poll_interval),
            sentry_dsn: var("SENTRY_DSN"),
            environment: var("ENVIRONMENT").unwrap_or_else(|| "local".to_string()),
        })
    }
}
