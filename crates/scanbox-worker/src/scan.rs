use crate::backend::ScanBackend;
use scanbox_core::{JobFailure, JobResult, ScanJob, ScanboxError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Raw findings are not forwarded; the engine expects a JSON array.
const RAW_FINDINGS: &str = "[]";

/// Consumes the job queue and runs each job's targets through a backend.
///
/// A job produces exactly one outcome: a [`JobResult`] with the findings of
/// all targets, or a [`JobFailure`] for the first target that failed.
pub struct ScanWorker {
    backend: Arc<dyn ScanBackend>,
    scan_timeout: Duration,
}

impl ScanWorker {
    /// Creates a worker bounding each target scan by `scan_timeout`.
    pub fn new(backend: Arc<dyn ScanBackend>, scan_timeout: Duration) -> Self {
        Self {
            backend,
            scan_timeout,
        }
    }

    /// Scans every target of `job` in order.
    pub async fn process(&self, job: &ScanJob) -> Result<JobResult, JobFailure> {
        info!(job_id = %job.job_id, backend = self.backend.name(), "Working on job");
        let mut findings = Vec::new();

        for target in &job.targets {
            info!(job_id = %job.job_id, location = %target.location, "Scanning target");
            match tokio::time::timeout(self.scan_timeout, self.backend.scan(target)).await {
                Ok(Ok(mut found)) => {
                    debug!(job_id = %job.job_id, location = %target.location, count = found.len(), "Target finished");
                    findings.append(&mut found);
                }
                Ok(Err(ScanboxError::Scan(message))) => {
                    return Err(JobFailure::new(&job.job_id, message, ""));
                }
                Ok(Err(e)) => {
                    return Err(JobFailure::new(
                        &job.job_id,
                        "Error while running scan",
                        e.to_string(),
                    ));
                }
                Err(_) => {
                    return Err(JobFailure::new(
                        &job.job_id,
                        "Scan timed out",
                        format!(
                            "Scanning '{}' took longer than {}s",
                            target.location,
                            self.scan_timeout.as_secs()
                        ),
                    ));
                }
            }
        }

        Ok(JobResult {
            job_id: job.job_id.clone(),
            findings,
            raw_findings: RAW_FINDINGS.to_string(),
        })
    }

    /// Runs until the job queue closes or `cancel` fires.
    ///
    /// On cancellation, the job in progress and any jobs still queued are
    /// reported as failures so the engine can hand them out again.
    pub async fn run(
        self,
        mut jobs: mpsc::Receiver<ScanJob>,
        results: mpsc::Sender<JobResult>,
        failures: mpsc::Sender<JobFailure>,
        cancel: CancellationToken,
    ) {
        loop {
            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(shutdown_failure(&job)),
                outcome = self.process(&job) => outcome,
            };

            let delivered = match outcome {
                Ok(result) => results.send(result).await.is_ok(),
                Err(failure) => failures.send(failure).await.is_ok(),
            };
            if !delivered {
                warn!(job_id = %job.job_id, "Outcome queue closed, stopping worker");
                return;
            }
        }

        jobs.close();
        while let Ok(job) = jobs.try_recv() {
            if failures.send(shutdown_failure(&job)).await.is_err() {
                break;
            }
        }
        info!("Scan worker stopped");
    }
}

pub(crate) fn shutdown_failure(job: &ScanJob) -> JobFailure {
    warn!(job_id = %job.job_id, "Abandoning job because the worker is shutting down");
    JobFailure::new(&job.job_id, "Worker shutting down", "")
}
