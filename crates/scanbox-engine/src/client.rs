use crate::config::EngineConfig;
use crate::{EngineApi, LockOutcome};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use scanbox_core::{FailureReport, ResultSubmission, ScanJob, ScanboxError, ScanboxResult};
use serde::Serialize;
use tracing::{debug, error};

/// HTTP client for the engine's job endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct EngineClient {
    config: EngineConfig,
    base: Url,
    http: reqwest::Client,
}

impl EngineClient {
    /// Builds a client for the given engine. Fails if the base URL cannot
    /// carry a path.
    pub fn new(config: EngineConfig) -> ScanboxResult<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            ScanboxError::Config(format!("Invalid engine URL '{}': {e}", config.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(ScanboxError::Config(format!(
                "Invalid engine URL '{}': not a base URL",
                config.base_url
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ScanboxError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, base, http })
    }

    /// The engine this client talks to.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Every engine request is a JSON POST, optionally with Basic auth.
    fn post(&self, segments: &[&str]) -> reqwest::RequestBuilder {
        let request = self
            .http
            .post(self.url(segments))
            .header(CONTENT_TYPE, "application/json");
        match &self.config.basic_auth {
            Some(auth) => request.basic_auth(&auth.username, Some(&auth.password)),
            None => request,
        }
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &T,
        context: &str,
    ) -> ScanboxResult<()> {
        let body = serde_json::to_vec(body).map_err(|e| {
            error!(error = %e, "Failed to encode payload while {context}");
            ScanboxError::Encode(format!("{context}: {e}"))
        })?;

        let resp = self
            .post(segments)
            .body(body)
            .send()
            .await
            .map_err(|e| ScanboxError::Transport(format!("{context}: {e}")))?;

        match resp.status() {
            StatusCode::OK => Ok(()),
            status => Err(protocol_error(status, context)),
        }
    }
}

/// Maps a rejected status to an error. Codes outside the contract are also
/// logged here.
fn protocol_error(status: StatusCode, context: &str) -> ScanboxError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::INTERNAL_SERVER_ERROR => {}
        other => error!(
            status = other.as_u16(),
            "Unexpected response code from engine while {context}"
        ),
    }
    ScanboxError::engine(status.as_u16(), context)
}

#[async_trait]
impl EngineApi for EngineClient {
    async fn lock_job(&self, task_name: &str, worker_id: &str) -> ScanboxResult<LockOutcome> {
        let context = "locking a job";
        let resp = self
            .post(&["box", "jobs", "lock", task_name, worker_id])
            .send()
            .await
            .map_err(|e| ScanboxError::Transport(format!("{context}: {e}")))?;

        match resp.status() {
            StatusCode::OK => {
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| ScanboxError::Decode(format!("reading job body: {e}")))?;
                let job: ScanJob = serde_json::from_slice(&body)
                    .map_err(|e| ScanboxError::Decode(format!("invalid job document: {e}")))?;
                debug!(job_id = %job.job_id, targets = job.targets.len(), "Locked job");
                Ok(LockOutcome::Job(job))
            }
            StatusCode::NO_CONTENT => Ok(LockOutcome::NoJobAvailable),
            status => Err(protocol_error(status, context)),
        }
    }

    async fn submit_result(
        &self,
        job_id: &str,
        submission: &ResultSubmission,
    ) -> ScanboxResult<()> {
        self.post_json(
            &["box", "jobs", job_id, "result"],
            submission,
            "submitting a result",
        )
        .await
    }

    async fn submit_failure(&self, job_id: &str, report: &FailureReport) -> ScanboxResult<()> {
        self.post_json(
            &["box", "jobs", job_id, "failure"],
            report,
            "submitting a failure",
        )
        .await
    }
}
