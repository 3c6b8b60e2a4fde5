use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Value reported for build metadata that was not provided.
pub const UNKNOWN: &str = "unknown";

/// Task counters. Only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Jobs locked from the engine.
    pub started: u64,
    /// Results the engine acknowledged.
    pub completed: u64,
    /// Jobs that failed or whose result was rejected.
    pub failed: u64,
}

/// Last known reachability of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Time of the last confirmed exchange, `None` before the first one.
    pub last_successful_connection: Option<DateTime<Utc>>,
    /// Whether any exchange has ever succeeded.
    pub had_successful_connection: bool,
}

/// Outcome of the one-time backend self-test run at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfTestResult {
    /// Backend version string.
    pub version: String,
    /// Free-form details.
    pub details: String,
    /// Whether the backend is usable.
    pub successful: bool,
}

/// Snapshot of everything the [`StatusTracker`] holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Task counters.
    pub tasks: TaskStatus,
    /// Engine reachability.
    pub engine: EngineStatus,
    /// Self-test outcome, `None` while it has not finished.
    pub self_test: Option<SelfTestResult>,
}

/// Shared operational state of a running worker.
///
/// Updated concurrently by the job poller, both submitters and the scan
/// worker; read by the status endpoint. Counters are atomics, the engine
/// status sits behind a short-lived lock, and the self-test result can only
/// be set once.
#[derive(Debug, Default)]
pub struct StatusTracker {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    engine: RwLock<EngineStatus>,
    self_test: OnceLock<SelfTestResult>,
}

impl StatusTracker {
    /// Creates a tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A job was locked from the engine.
    pub fn record_job_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    /// The engine accepted a job result.
    pub fn record_job_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// A job failed, or its result could not be delivered.
    pub fn record_job_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Records the outcome of an exchange with the engine.
    ///
    /// Only successful contacts change anything; `had_successful_connection`
    /// never goes back to `false`.
    pub fn record_engine_contact(&self, success: bool) {
        if !success {
            return;
        }
        let mut engine = self.engine.write();
        engine.last_successful_connection = Some(Utc::now());
        engine.had_successful_connection = true;
    }

    /// Stores the self-test outcome. Returns `false` if one was already stored.
    pub fn record_self_test(&self, result: SelfTestResult) -> bool {
        self.self_test.set(result).is_ok()
    }

    /// Current task counters.
    pub fn tasks(&self) -> TaskStatus {
        TaskStatus {
            started: self.started.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }

    /// Current engine reachability.
    pub fn engine(&self) -> EngineStatus {
        self.engine.read().clone()
    }

    /// The stored self-test outcome, if the self-test has finished.
    pub fn self_test(&self) -> Option<&SelfTestResult> {
        self.self_test.get()
    }

    /// Healthy means the self-test finished and succeeded. Engine
    /// reachability does not affect it.
    pub fn is_healthy(&self) -> bool {
        self.self_test().is_some_and(|t| t.successful)
    }

    /// Reads all state at once.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            tasks: self.tasks(),
            engine: self.engine(),
            self_test: self.self_test().cloned(),
        }
    }
}

/// Build metadata surfaced on `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// VCS commit.
    pub commit_id: String,
    /// Source repository.
    pub repository_url: String,
    /// VCS branch.
    pub branch: String,
}

impl BuildInfo {
    /// Reads `SCB_COMMIT_ID`, `SCB_REPOSITORY_URL` and `SCB_BRANCH` through
    /// `lookup`, defaulting each to `"unknown"`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            commit_id: get("SCB_COMMIT_ID"),
            repository_url: get("SCB_REPOSITORY_URL"),
            branch: get("SCB_BRANCH"),
        }
    }

    /// Reads build metadata from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// `UP` or `DOWN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthCheck {
    /// Self-test passed.
    Up,
    /// Self-test failed or has not run.
    Down,
}

/// Self-test run details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    /// Free-form details.
    pub details: String,
    /// Whether the test run passed.
    pub successful: bool,
}

/// Scanner section of the status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerInfo {
    /// Backend version.
    pub version: String,
    /// Self-test outcome.
    pub test_run: TestRun,
}

/// The document served on `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerStatus {
    /// Process start time.
    pub started_at: DateTime<Utc>,
    /// Worker identity reported to the engine.
    pub worker_id: String,
    /// Computed health.
    pub healthcheck: HealthCheck,
    /// Task counters.
    pub status: TaskStatus,
    /// Engine reachability.
    pub engine: EngineStatus,
    /// Backend self-test.
    pub scanner: ScannerInfo,
    /// Build metadata.
    pub build: BuildInfo,
}

impl ScannerStatus {
    /// Assembles the document from a fresh tracker snapshot.
    pub fn from_snapshot(
        snapshot: StatusSnapshot,
        started_at: DateTime<Utc>,
        worker_id: impl Into<String>,
        build: BuildInfo,
    ) -> Self {
        let (scanner, healthy) = match snapshot.self_test {
            Some(test) => (
                ScannerInfo {
                    version: test.version,
                    test_run: TestRun {
                        details: test.details,
                        successful: test.successful,
                    },
                },
                test.successful,
            ),
            None => (
                ScannerInfo {
                    version: String::new(),
                    test_run: TestRun {
                        details: "Self-test has not finished".to_string(),
                        successful: false,
                    },
                },
                false,
            ),
        };

        Self {
            started_at,
            worker_id: worker_id.into(),
            healthcheck: if healthy {
                HealthCheck::Up
            } else {
                HealthCheck::Down
            },
            status: snapshot.tasks,
            engine: snapshot.engine,
            scanner,
            build,
        }
    }

    /// Whether the document reports a healthy worker.
    pub fn is_healthy(&self) -> bool {
        self.healthcheck == HealthCheck::Up
    }
}
