//! Replay target configuration.
//!
//! The runner reaches the mock at `base_url` with its port replaced by
//! `port`, so the same port value drives both the bind and the target.

use std::time::Duration;

use url::Url;

use replay_core::InteractionRequest;

/// Default base URL of the mock.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1";

/// Default mock port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default per-call deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where and how the runner replays interactions.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Scheme, host and optional path prefix of the mock.
    pub base_url: Url,
    /// Port the mock listens on.
    pub port: u16,
    /// Deadline for each call, covering send and body read.
    pub request_timeout: Duration,
}

impl ReplayConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `REPLAY_BASE_URL` (default: `http://127.0.0.1`)
    /// - `REPLAY_PORT` (default: 8080)
    /// - `REPLAY_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("REPLAY_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url("REPLAY_BASE_URL", &base_url)?;

        let port = match lookup("REPLAY_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("REPLAY_PORT".to_string(), raw))?,
            None => DEFAULT_PORT,
        };

        let timeout_secs: u64 = match lookup("REPLAY_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("REPLAY_TIMEOUT_SECS".to_string(), raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            base_url,
            port,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Point at a local mock on `port` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the loopback URL cannot be parsed.
    pub fn local(port: u16) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("base URL", DEFAULT_BASE_URL)?,
            port,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Replace the target port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replace the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full URL for a recorded request: base URL, port, path prefix, the
    /// request path, then its query string.
    pub fn target_url(&self, request: &InteractionRequest) -> Result<Url, ConfigError> {
        let mut url = self.base_url.clone();
        url.set_port(Some(self.port))
            .map_err(|()| ConfigError::InvalidUrl("base URL".to_string(), "cannot carry a port".to_string()))?;
        let prefix = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}{}", request.path));
        url.set_query(request.query.as_deref());
        Ok(url)
    }
}

/// Accepts a URL that can carry a port; an empty path means `/`.
pub fn parse_base_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() || url.host().is_none() {
        return Err(ConfigError::InvalidUrl(
            var.to_string(),
            format!("'{raw}' has no host"),
        ));
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: '{1}' is not a valid number")]
    InvalidNumber(String, String),
    #[error("REPLAY_TIMEOUT_SECS must be at least 1")]
    ZeroTimeout,
    #[error("base URL '{0}' has a path; the mock serves recorded paths from the root")]
    BasePath(String),
}
