//! Client side of the orchestration engine's job contract.
//!
//! The engine exposes three endpoints to workers:
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | POST | `/box/jobs/lock/{taskName}/{workerId}` | 200 + job, 204 when idle |
//! | POST | `/box/jobs/{jobId}/result` | 200 |
//! | POST | `/box/jobs/{jobId}/failure` | 200 |
//!
//! [`EngineClient`] speaks this contract over HTTP. Pipeline stages depend on
//! the [`EngineApi`] trait instead so they can run against an in-memory engine
//! in tests.

/// The HTTP implementation of [`EngineApi`].
pub mod client;
/// Engine address, credentials and timeouts.
pub mod config;

pub use client::EngineClient;
pub use config::{BasicAuth, EngineConfig, DEFAULT_ENGINE_URL};

use async_trait::async_trait;
use scanbox_core::{FailureReport, ResultSubmission, ScanJob, ScanboxResult};

/// Outcome of a successful lock request.
#[derive(Debug, Clone, PartialEq)]
pub enum LockOutcome {
    /// The engine handed out a job.
    Job(ScanJob),
    /// Nothing to do right now (HTTP 204).
    NoJobAvailable,
}

/// Operations a worker performs against the engine.
///
/// Implementations do not retry and hold no per-call state. Every error is
/// returned to the caller, which decides how to count it.
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// Locks the next job for `task_name` on behalf of `worker_id`.
    async fn lock_job(&self, task_name: &str, worker_id: &str) -> ScanboxResult<LockOutcome>;

    /// Reports the findings of a finished job.
    async fn submit_result(&self, job_id: &str, submission: &ResultSubmission)
        -> ScanboxResult<()>;

    /// Reports that a job failed.
    async fn submit_failure(&self, job_id: &str, report: &FailureReport) -> ScanboxResult<()>;
}
