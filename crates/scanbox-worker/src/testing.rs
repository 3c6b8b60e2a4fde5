//! In-memory engine and backend shared by the unit tests of this crate.

use crate::backend::ScanBackend;
use async_trait::async_trait;
use parking_lot::Mutex;
use scanbox_core::{
    FailureReport, Finding, ResultSubmission, ScanJob, ScanboxError, ScanboxResult,
    SelfTestResult, Target,
};
use scanbox_engine::{EngineApi, LockOutcome};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

pub(crate) fn job(id: &str) -> ScanJob {
    ScanJob {
        job_id: id.to_string(),
        targets: vec![Target::new("t", "example.com")],
    }
}

/// Scripted engine. Lock answers are popped in order and default to
/// "no job"; submissions answer with the configured status.
#[derive(Default)]
pub(crate) struct MockEngine {
    locks: Mutex<VecDeque<ScanboxResult<LockOutcome>>>,
    lock_calls: Mutex<Vec<(String, String)>>,
    results: Mutex<Vec<(String, ResultSubmission)>>,
    failures: Mutex<Vec<(String, FailureReport)>>,
    submit_status: Mutex<Option<u16>>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_lock(&self, outcome: ScanboxResult<LockOutcome>) {
        self.locks.lock().push_back(outcome);
    }

    /// Makes every submission fail with the given HTTP status.
    pub(crate) fn reject_submissions(&self, code: u16) {
        *self.submit_status.lock() = Some(code);
    }

    pub(crate) fn lock_calls(&self) -> Vec<(String, String)> {
        self.lock_calls.lock().clone()
    }

    pub(crate) fn results(&self) -> Vec<(String, ResultSubmission)> {
        self.results.lock().clone()
    }

    pub(crate) fn failures(&self) -> Vec<(String, FailureReport)> {
        self.failures.lock().clone()
    }

    fn submit_outcome(&self, context: &str) -> ScanboxResult<()> {
        match *self.submit_status.lock() {
            Some(code) => Err(ScanboxError::engine(code, context)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EngineApi for MockEngine {
    async fn lock_job(&self, task_name: &str, worker_id: &str) -> ScanboxResult<LockOutcome> {
        self.lock_calls
            .lock()
            .push((task_name.to_string(), worker_id.to_string()));
        let next = self.locks.lock().pop_front();
        match next {
            Some(outcome) => outcome,
            None => {
                tokio::task::yield_now().await;
                Ok(LockOutcome::NoJobAvailable)
            }
        }
    }

    async fn submit_result(
        &self,
        job_id: &str,
        submission: &ResultSubmission,
    ) -> ScanboxResult<()> {
        self.results
            .lock()
            .push((job_id.to_string(), submission.clone()));
        self.submit_outcome("submitting a result")
    }

    async fn submit_failure(&self, job_id: &str, report: &FailureReport) -> ScanboxResult<()> {
        self.failures
            .lock()
            .push((job_id.to_string(), report.clone()));
        self.submit_outcome("submitting a failure")
    }
}

/// Backend answering from a per-location table. Unknown locations yield no
/// findings; `error` locations fail; `slow` locations never finish in time.
#[derive(Default)]
pub(crate) struct MockBackend {
    pub(crate) findings: HashMap<String, Vec<String>>,
    pub(crate) self_test_passes: bool,
}

impl MockBackend {
    pub(crate) fn with_subdomains(location: &str, names: &[&str]) -> Self {
        let mut findings = HashMap::new();
        findings.insert(
            location.to_string(),
            names.iter().map(|n| (*n).to_string()).collect(),
        );
        Self {
            findings,
            self_test_passes: true,
        }
    }
}

#[async_trait]
impl ScanBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn self_test(&self) -> SelfTestResult {
        SelfTestResult {
            version: "mock-1".into(),
            details: String::new(),
            successful: self.self_test_passes,
        }
    }

    async fn scan(&self, target: &Target) -> ScanboxResult<Vec<Finding>> {
        match target.location.as_str() {
            "error" => Err(ScanboxError::Scan("Failed to start scan".into())),
            "slow" => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
            location => Ok(self
                .findings
                .get(location)
                .map(|names| {
                    names
                        .iter()
                        .map(|n| Finding::new(n.as_str(), n.as_str(), "Subdomain"))
                        .collect()
                })
                .unwrap_or_default()),
        }
    }
}
