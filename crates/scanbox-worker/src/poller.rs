use crate::policy::PollDelay;
use crate::scan::shutdown_failure;
use scanbox_core::{JobFailure, ScanJob, ScanboxResult, StatusTracker};
use scanbox_engine::{EngineApi, LockOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Poller state between lock attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    /// Ready to ask the engine for a job.
    Idle,
    /// Sleeping before the next attempt.
    Waiting(Duration),
}

/// Perpetual job acquisition loop.
///
/// Alternates between locking a job and waiting. A locked job is counted as
/// started and then handed to the job queue; the hand-off suspends until the
/// worker has room for it. Every suspension point also watches the
/// cancellation token.
pub struct JobPoller {
    engine: Arc<dyn EngineApi>,
    tracker: Arc<StatusTracker>,
    delay: Arc<dyn PollDelay>,
    task_name: String,
    worker_id: String,
}

impl JobPoller {
    /// Creates a poller locking jobs of `task_name` as `worker_id`.
    pub fn new(
        engine: Arc<dyn EngineApi>,
        tracker: Arc<StatusTracker>,
        delay: Arc<dyn PollDelay>,
        task_name: impl Into<String>,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            tracker,
            delay,
            task_name: task_name.into(),
            worker_id: worker_id.into(),
        }
    }

    /// Runs until cancelled or until the job queue is closed.
    ///
    /// A job that is locked but never reaches the worker is reported on
    /// `failures` so the engine can hand it out again. Dropping out of this
    /// function drops `jobs`, which tells the worker that no more jobs will
    /// arrive.
    pub async fn run(
        self,
        jobs: mpsc::Sender<ScanJob>,
        failures: mpsc::Sender<JobFailure>,
        cancel: CancellationToken,
    ) {
        info!(task = %self.task_name, "Job poller started");
        let mut state = PollState::Idle;
        let mut streak: u32 = 0;

        loop {
            state = match state {
                PollState::Idle => {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        outcome = self.engine.lock_job(&self.task_name, &self.worker_id) => outcome,
                    };

                    if let Some(job) = self.on_lock(outcome, &mut streak) {
                        let stranded = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => Some(job),
                            sent = jobs.reserve() => match sent {
                                Ok(permit) => {
                                    permit.send(job);
                                    None
                                }
                                Err(_) => {
                                    warn!(job_id = %job.job_id, "Job queue closed, stopping poller");
                                    Some(job)
                                }
                            },
                        };
                        if let Some(job) = stranded {
                            if failures.send(shutdown_failure(&job)).await.is_err() {
                                warn!(job_id = %job.job_id, "Failure queue closed, locked job not reported");
                            }
                            break;
                        }
                    }
                    PollState::Waiting(self.delay.delay(streak))
                }
                PollState::Waiting(delay) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    PollState::Idle
                }
            };
        }

        info!("Job poller stopped");
    }

    /// Updates the tracker for one lock attempt and returns the job, if any.
    fn on_lock(
        &self,
        outcome: ScanboxResult<LockOutcome>,
        failures: &mut u32,
    ) -> Option<ScanJob> {
        match outcome {
            Ok(LockOutcome::Job(job)) => {
                self.tracker.record_engine_contact(true);
                self.tracker.record_job_started();
                *failures = 0;
                info!(job_id = %job.job_id, targets = job.targets.len(), "Acquired job");
                Some(job)
            }
            Ok(LockOutcome::NoJobAvailable) => {
                self.tracker.record_engine_contact(true);
                *failures = 0;
                debug!("No jobs available. Going to sleep.");
                None
            }
            Err(e) if e.engine_reached() => {
                self.tracker.record_engine_contact(true);
                *failures = 0;
                warn!(error = %e, "Engine returned a job that could not be read");
                None
            }
            Err(e) => {
                self.tracker.record_engine_contact(false);
                *failures = failures.saturating_add(1);
                warn!(error = %e, consecutive_failures = *failures, "Failed to fetch job from engine");
                None
            }
        }
    }
}
