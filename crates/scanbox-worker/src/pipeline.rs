use scanbox_core::{JobFailure, JobResult, StatusTracker, WorkerIdentity};
use scanbox_engine::EngineApi;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Drains the results queue into the engine, one result at a time.
///
/// Submissions are never retried or requeued: a rejected result is counted
/// as a failed job and the next one is processed.
pub struct ResultSubmitter {
    engine: Arc<dyn EngineApi>,
    tracker: Arc<StatusTracker>,
    identity: WorkerIdentity,
}

impl ResultSubmitter {
    /// Creates a submitter reporting as `identity`.
    pub fn new(
        engine: Arc<dyn EngineApi>,
        tracker: Arc<StatusTracker>,
        identity: WorkerIdentity,
    ) -> Self {
        Self {
            engine,
            tracker,
            identity,
        }
    }

    /// Submits one result. Returns whether the engine accepted it.
    pub async fn submit(&self, result: JobResult) -> bool {
        let job_id = result.job_id.clone();
        info!(job_id = %job_id, findings = result.findings.len(), "Submitting result");

        let submission = result.into_submission(&self.identity);
        match self.engine.submit_result(&job_id, &submission).await {
            Ok(()) => {
                self.tracker.record_engine_contact(true);
                self.tracker.record_job_completed();
                info!(job_id = %job_id, "Successfully submitted result");
                true
            }
            Err(e) => {
                self.tracker.record_job_failed();
                warn!(job_id = %job_id, error = %e, "Failed to submit result");
                false
            }
        }
    }

    /// Runs until every sender of `results` is dropped and the queue is empty.
    pub async fn run(self, mut results: mpsc::Receiver<JobResult>) {
        while let Some(result) = results.recv().await {
            self.submit(result).await;
        }
        info!("Result submitter stopped");
    }
}

/// Drains the failures queue into the engine, one failure at a time.
///
/// A failure counts against the worker the moment it is observed, whether or
/// not the report reaches the engine.
pub struct FailureSubmitter {
    engine: Arc<dyn EngineApi>,
    tracker: Arc<StatusTracker>,
    identity: WorkerIdentity,
}

impl FailureSubmitter {
    /// Creates a submitter reporting as `identity`.
    pub fn new(
        engine: Arc<dyn EngineApi>,
        tracker: Arc<StatusTracker>,
        identity: WorkerIdentity,
    ) -> Self {
        Self {
            engine,
            tracker,
            identity,
        }
    }

    /// Submits one failure. Returns whether the engine accepted the report.
    pub async fn submit(&self, failure: JobFailure) -> bool {
        self.tracker.record_job_failed();
        warn!(
            job_id = %failure.job_id,
            message = %failure.error_message,
            "Submitting failure"
        );

        let report = failure.to_report(&self.identity);
        match self.engine.submit_failure(&failure.job_id, &report).await {
            Ok(()) => {
                self.tracker.record_engine_contact(true);
                info!(job_id = %failure.job_id, "Successfully submitted failure");
                true
            }
            Err(e) => {
                warn!(job_id = %failure.job_id, error = %e, "Failed to submit failure");
                false
            }
        }
    }

    /// Runs until every sender of `failures` is dropped and the queue is empty.
    pub async fn run(self, mut failures: mpsc::Receiver<JobFailure>) {
        while let Some(failure) = failures.recv().await {
            self.submit(failure).await;
        }
        info!("Failure submitter stopped");
    }
}
