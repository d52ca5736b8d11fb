//! HTTP client configuration

use crate::error::{HttpError, HttpResult};
use std::env;
use std::time::Duration;

/// Configuration for [`HttpAsyncClient`](crate::HttpAsyncClient).
///
/// Fixed once the client is built; construct another client for a different
/// timeout policy.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Upper bound on a whole request, from send until the body is drained
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Idle connection timeout
    pub pool_idle_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow
    pub max_redirects: usize,

    /// User-Agent header value
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(90),
            follow_redirects: true,
            max_redirects: 10,
            user_agent: format!("esdb-http/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `ESDB_HTTP_TIMEOUT_SECS`,
    /// `ESDB_HTTP_CONNECT_TIMEOUT_SECS` and `ESDB_HTTP_USER_AGENT`
    pub fn from_env() -> HttpResult<Self> {
        let mut config = Self::default();

        if let Some(secs) = env_secs("ESDB_HTTP_TIMEOUT_SECS")? {
            config.timeout = secs;
        }
        if let Some(secs) = env_secs("ESDB_HTTP_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = secs;
        }
        if let Ok(user_agent) = env::var("ESDB_HTTP_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(config)
    }

    /// Set the total timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout from seconds
    ///
    /// # Panics
    ///
    /// Panics if `secs` is negative, NaN or too large for a `Duration`.
    /// Use [`HttpClientConfig::timeout`] when the value is not trusted.
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set max idle connections per host
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set idle connection timeout
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Set maximum redirects
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

fn env_secs(name: &str) -> HttpResult<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => parse_secs(&raw)
            .map(Some)
            .map_err(|reason| HttpError::Config(format!("{}: {}", name, reason))),
        Err(_) => Ok(None),
    }
}

fn parse_secs(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("'{}' is not a number of seconds ({})", raw, e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("'{}' is out of range ({})", raw, e))
}
