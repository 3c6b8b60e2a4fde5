use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decides how long the poller waits before the next lock attempt.
pub trait PollDelay: Send + Sync {
    /// Delay after a poll, given how many lock attempts in a row failed to
    /// reach the engine. `0` means the engine answered last time.
    fn delay(&self, consecutive_failures: u32) -> Duration;
}

/// Fixed interval while the engine answers, exponential backoff while it
/// does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay between polls while the engine is reachable.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Cap for the backoff delay.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl PollPolicy {
    /// Always waits `interval`, no backoff.
    pub fn fixed(interval: Duration) -> Self {
        let ms = interval.as_millis() as u64;
        Self {
            interval_ms: ms,
            backoff_max_ms: ms,
        }
    }

    /// Never waits. Meant for tests.
    pub fn immediate() -> Self {
        Self::fixed(Duration::ZERO)
    }
}

impl PollDelay for PollPolicy {
    fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::from_millis(self.interval_ms);
        }
        let factor = 2u64.saturating_pow(consecutive_failures.min(32));
        let cap = self.backoff_max_ms.max(self.interval_ms);
        Duration::from_millis(self.interval_ms.saturating_mul(factor).min(cap))
    }
}
