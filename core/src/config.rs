//! Client configuration and credentials.
//!
//! # Design
//! Everything the client needs is passed explicitly to
//! `ZenzapClient::new` through a `ClientConfig`; there is no global state.
//! `from_env` reads the same variable names the integration scripts use
//! (`BOT_API_KEY`, `BOT_SECRET`, `API_BASE_URL`, `API_TIMEOUT_SECS`).

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{Result, ZenzapError};

pub const DEFAULT_BASE_URL: &str = "https://api.zenzap.co";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_API_KEY: &str = "BOT_API_KEY";
pub const ENV_SECRET: &str = "BOT_SECRET";
pub const ENV_BASE_URL: &str = "API_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "API_TIMEOUT_SECS";

/// Bot API key (bearer token) and HMAC signing secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(api_key, secret),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Missing credentials are reported here; the remaining checks run in
    /// [`ClientConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY)
            .ok_or_else(|| ZenzapError::configuration(format!("{ENV_API_KEY} is not set")))?;
        let secret = lookup(ENV_SECRET)
            .ok_or_else(|| ZenzapError::configuration(format!("{ENV_SECRET} is not set")))?;

        let mut config = Self::new(api_key, secret);
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            let secs: f64 = raw.trim().parse().map_err(|_| {
                ZenzapError::configuration(format!("{ENV_TIMEOUT_SECS} is not a number: {raw:?}"))
            })?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ZenzapError::configuration(format!(
                    "{ENV_TIMEOUT_SECS} must be positive, got {raw:?}"
                )));
            }
            config.timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
                ZenzapError::configuration(format!("{ENV_TIMEOUT_SECS} is out of range: {raw:?}"))
            })?;
        }
        Ok(config)
    }

    /// Base URL without trailing slashes.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        if self.credentials.api_key.trim().is_empty() {
            return Err(ZenzapError::configuration("API key must not be empty"));
        }
        if self.credentials.secret.is_empty() {
            return Err(ZenzapError::configuration("signing secret must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(ZenzapError::configuration("timeout must be greater than zero"));
        }

        let url = Url::parse(self.normalized_base_url())
            .map_err(|e| ZenzapError::configuration(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ZenzapError::configuration(format!(
                    "base URL scheme must be http or https, got {other:?}"
                )))
            }
        }
        if url.query().is_some() {
            return Err(ZenzapError::configuration("base URL must not carry a query string"));
        }
        Ok(())
    }
}
