//! Core types and error definitions for the scanbox worker harness.
//!
//! This crate provides the types shared by every scanbox crate: the jobs and
//! findings exchanged with the orchestration engine, the status document
//! served on `/status`, and the [`StatusTracker`] that the concurrent
//! pipeline stages update.
//!
//! # Main types
//!
//! - [`ScanboxError`]: Unified error enum for all harness subsystems.
//! - [`ScanboxResult`]: Convenience alias for `Result<T, ScanboxError>`.
//! - [`ScanJob`] / [`Target`]: Work items handed out by the engine.
//! - [`Finding`]: A single fact discovered by a scanning backend.
//! - [`JobResult`] / [`JobFailure`]: Outcomes of a job before they are sent back.
//! - [`StatusTracker`]: Concurrency-safe task counters and engine reachability.
//! - [`ScannerStatus`]: The health document served by the status endpoint.

/// Error taxonomy shared across the harness.
pub mod error;
/// Findings and their classification enums.
pub mod finding;
/// Jobs, targets and the job outcome wire documents.
pub mod job;
/// Operational counters and the health document.
pub mod status;

pub use error::{ScanboxError, ScanboxResult};
pub use finding::{Finding, OsiLayer, Reference, Severity};
pub use job::{FailureReport, JobFailure, JobResult, ResultSubmission, ScanJob, Target};
pub use status::{
    BuildInfo, EngineStatus, HealthCheck, ScannerInfo, ScannerStatus, SelfTestResult,
    StatusSnapshot, StatusTracker, TaskStatus, TestRun,
};

use serde::{Deserialize, Serialize};

/// Identity a worker reports to the engine alongside every outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    /// Freshly generated id, unique per process.
    pub worker_id: String,
    /// Kind of scanner this worker runs (e.g. `SubdomainScanner`).
    pub scanner_type: String,
}

impl WorkerIdentity {
    /// Creates an identity with a new random worker id.
    pub fn generate(scanner_type: impl Into<String>) -> Self {
        Self {
            worker_id: uuid::Uuid::new_v4().to_string(),
            scanner_type: scanner_type.into(),
        }
    }
}
