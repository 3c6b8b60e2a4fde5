use crate::backend::ScanBackend;
use crate::pipeline::{FailureSubmitter, ResultSubmitter};
use crate::policy::{PollDelay, PollPolicy};
use crate::poller::JobPoller;
use crate::scan::ScanWorker;
use chrono::{DateTime, Utc};
use scanbox_core::{BuildInfo, SelfTestResult, StatusTracker, WorkerIdentity};
use scanbox_engine::EngineApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Tunables of the pipeline.
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    /// Engine task to lock jobs for.
    pub task_name: String,
    /// Capacity of the result and failure queues. The job queue always holds
    /// a single job so the poller does not lock work it cannot start.
    pub queue_capacity: usize,
    /// How long submitters may keep draining after shutdown starts.
    pub drain_timeout: Duration,
    /// Upper bound for scanning one target.
    pub scan_timeout: Duration,
    /// Delay between lock attempts.
    pub poll: PollPolicy,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            task_name: "subdomain_scan".to_string(),
            queue_capacity: 16,
            drain_timeout: Duration::from_secs(30),
            scan_timeout: Duration::from_secs(3600),
            poll: PollPolicy::default(),
        }
    }
}

/// Wires poller, scan worker and submitters around shared queues.
pub struct Harness {
    engine: Arc<dyn EngineApi>,
    backend: Arc<dyn ScanBackend>,
    tracker: Arc<StatusTracker>,
    identity: WorkerIdentity,
    settings: HarnessSettings,
    delay: Arc<dyn PollDelay>,
    started_at: DateTime<Utc>,
}

impl Harness {
    /// Creates a harness with a fresh tracker.
    pub fn new(
        engine: Arc<dyn EngineApi>,
        backend: Arc<dyn ScanBackend>,
        identity: WorkerIdentity,
        settings: HarnessSettings,
    ) -> Self {
        let delay: Arc<dyn PollDelay> = Arc::new(settings.poll.clone());
        Self {
            engine,
            backend,
            tracker: Arc::new(StatusTracker::new()),
            identity,
            settings,
            delay,
            started_at: Utc::now(),
        }
    }

    /// Replaces the poll delay policy.
    pub fn with_poll_delay(mut self, delay: Arc<dyn PollDelay>) -> Self {
        self.delay = delay;
        self
    }

    /// The tracker shared by all stages.
    pub fn tracker(&self) -> Arc<StatusTracker> {
        self.tracker.clone()
    }

    /// Identity reported to the engine.
    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// When the harness was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Runs the backend self-test and stores its outcome.
    ///
    /// A failing self-test does not stop the worker; it stays unhealthy.
    pub async fn run_self_test(&self) -> SelfTestResult {
        let result = self.backend.self_test().await;
        if result.successful {
            info!(version = %result.version, "Scanner self-test passed");
        } else {
            error!(details = %result.details, "Scanner self-test failed, reporting unhealthy");
        }
        if !self.tracker.record_self_test(result.clone()) {
            warn!("Self-test already recorded, keeping the first result");
        }
        result
    }

    /// Logs the worker settings at startup.
    pub fn log_configuration(&self, engine_url: &str, build: &BuildInfo) {
        let self_test = self.tracker.self_test();
        info!(
            worker_id = %self.identity.worker_id,
            task = %self.settings.task_name,
            scanner_type = %self.identity.scanner_type,
            engine = %engine_url,
            "Worker settings"
        );
        info!(
            backend = self.backend.name(),
            test_run = self_test.map(|t| t.successful),
            version = self_test.map(|t| t.version.as_str()),
            "Scanner status"
        );
        info!(
            commit = %build.commit_id,
            repository = %build.repository_url,
            branch = %build.branch,
            "Build"
        );
    }

    /// Spawns every stage. Stages stop once `cancel` fires.
    pub fn start(self, cancel: CancellationToken) -> HarnessHandle {
        let (jobs_tx, jobs_rx) = mpsc::channel(1);
        let (results_tx, results_rx) = mpsc::channel(self.settings.queue_capacity.max(1));
        let (failures_tx, failures_rx) = mpsc::channel(self.settings.queue_capacity.max(1));

        let results = tokio::spawn(
            ResultSubmitter::new(
                self.engine.clone(),
                self.tracker.clone(),
                self.identity.clone(),
            )
            .run(results_rx),
        );
        let failures = tokio::spawn(
            FailureSubmitter::new(
                self.engine.clone(),
                self.tracker.clone(),
                self.identity.clone(),
            )
            .run(failures_rx),
        );
        let worker = tokio::spawn(
            ScanWorker::new(self.backend.clone(), self.settings.scan_timeout).run(
                jobs_rx,
                results_tx,
                failures_tx.clone(),
                cancel.clone(),
            ),
        );
        let poller = tokio::spawn(
            JobPoller::new(
                self.engine.clone(),
                self.tracker.clone(),
                self.delay.clone(),
                self.settings.task_name.clone(),
                self.identity.worker_id.clone(),
            )
            .run(jobs_tx, failures_tx, cancel.clone()),
        );

        info!(worker_id = %self.identity.worker_id, "Worker pipeline started");

        HarnessHandle {
            poller,
            worker,
            results,
            failures,
            cancel,
            drain_timeout: self.settings.drain_timeout,
        }
    }
}

/// Running pipeline.
pub struct HarnessHandle {
    poller: JoinHandle<()>,
    worker: JoinHandle<()>,
    results: JoinHandle<()>,
    failures: JoinHandle<()>,
    cancel: CancellationToken,
    drain_timeout: Duration,
}

impl HarnessHandle {
    /// The token every stage watches.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops acquiring jobs and waits for queued outcomes to be delivered.
    ///
    /// Poller and worker stop right away; the submitters get up to the drain
    /// timeout to empty their queues and are aborted after that.
    pub async fn shutdown(self) {
        info!("Shutting down worker pipeline");
        self.cancel.cancel();

        for (name, handle) in [("poller", self.poller), ("worker", self.worker)] {
            if let Err(e) = handle.await {
                error!(stage = name, error = %e, "Pipeline stage panicked");
            }
        }

        let deadline = tokio::time::Instant::now() + self.drain_timeout;
        for (name, mut handle) in [("results", self.results), ("failures", self.failures)] {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(stage = name, error = %e, "Pipeline stage panicked"),
                Err(_) => {
                    warn!(stage = name, "Drain timeout reached, dropping pending submissions");
                    handle.abort();
                }
            }
        }
        info!("Worker pipeline stopped");
    }
}
