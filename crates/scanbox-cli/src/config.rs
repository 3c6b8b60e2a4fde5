//! Worker configuration: TOML file, then environment overrides.

use scanbox_engine::{EngineConfig, DEFAULT_ENGINE_URL};
use scanbox_worker::{EnumeratorConfig, HarnessSettings, PollPolicy};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_engine_url")]
    pub engine_url: String,
    #[serde(default)]
    pub basic_auth_user: String,
    #[serde(default)]
    pub basic_auth_password: String,
    #[serde(default = "default_task_name")]
    pub task_name: String,
    #[serde(default = "default_scanner_type")]
    pub scanner_type: String,
    #[serde(default = "default_status_host")]
    pub status_host: String,
    #[serde(default = "default_status_port")]
    pub status_port: u16,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
    /// Verbose logging and enumerator output.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub poll: PollPolicy,
    #[serde(default)]
    pub enumerator: EnumeratorConfig,
}

fn default_engine_url() -> String {
    DEFAULT_ENGINE_URL.to_string()
}
fn default_task_name() -> String {
    "subdomain_scan".to_string()
}
fn default_scanner_type() -> String {
    "SubdomainScanner".to_string()
}
fn default_status_host() -> String {
    "0.0.0.0".to_string()
}
fn default_status_port() -> u16 {
    8080
}
fn default_queue_capacity() -> usize {
    16
}
fn default_drain_timeout_secs() -> u64 {
    30
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_scan_timeout_secs() -> u64 {
    3600
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            engine_url: default_engine_url(),
            basic_auth_user: String::new(),
            basic_auth_password: String::new(),
            task_name: default_task_name(),
            scanner_type: default_scanner_type(),
            status_host: default_status_host(),
            status_port: default_status_port(),
            queue_capacity: default_queue_capacity(),
            drain_timeout_secs: default_drain_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            scan_timeout_secs: default_scan_timeout_secs(),
            debug: false,
            poll: PollPolicy::default(),
            enumerator: EnumeratorConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Reads the TOML file at `path`, or returns defaults when there is none.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {e}", path.display())
        })?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {e}", path.display()))
    }

    /// Applies `ENGINE_ADDRESS`, `ENGINE_BASIC_AUTH_USER`,
    /// `ENGINE_BASIC_AUTH_PASSWORD` and `DEBUG`.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("ENGINE_ADDRESS").filter(|v| !v.is_empty()) {
            self.engine_url = url;
        }
        if let Some(user) = lookup("ENGINE_BASIC_AUTH_USER") {
            self.basic_auth_user = user;
        }
        if let Some(password) = lookup("ENGINE_BASIC_AUTH_PASSWORD") {
            self.basic_auth_password = password;
        }
        if lookup("DEBUG").is_some() {
            self.debug = true;
        }
        self
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig::new(&self.engine_url)
            .with_basic_auth(&self.basic_auth_user, &self.basic_auth_password)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }

    pub fn harness(&self) -> HarnessSettings {
        HarnessSettings {
            task_name: self.task_name.clone(),
            queue_capacity: self.queue_capacity,
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
            scan_timeout: Duration::from_secs(self.scan_timeout_secs),
            poll: self.poll.clone(),
        }
    }

    pub fn status_addr(&self) -> String {
        format!("{}:{}", self.status_host, self.status_port)
    }
}
