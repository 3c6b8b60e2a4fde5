use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default engine address.
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:8080";

/// Static credential pair sent as HTTP Basic auth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

/// How to reach the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Credentials, if auth is enabled.
    pub basic_auth: Option<BasicAuth>,
    /// Upper bound for a single request, including the response body.
    pub request_timeout: Duration,
}

impl EngineConfig {
    /// Creates a config for the given base URL without auth.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            basic_auth: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Enables Basic auth, but only when both values are non-empty.
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth = (!username.is_empty() && !password.is_empty()).then(|| BasicAuth {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Overrides the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_URL)
    }
}
