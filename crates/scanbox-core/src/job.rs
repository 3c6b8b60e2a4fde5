use crate::finding::Finding;
use crate::WorkerIdentity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single entity to scan, e.g. a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// The scan subject.
    pub location: String,
    /// Backend-specific options.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Target {
    /// Creates a target without attributes.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            attributes: HashMap::new(),
        }
    }
}

/// A unit of work locked from the engine.
///
/// The `job_id` is opaque and is sent back unchanged with the result or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJob {
    /// Engine-assigned id.
    pub job_id: String,
    /// Everything to scan for this job.
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// Findings of a finished job, before worker identity is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    /// Id of the job these findings belong to.
    pub job_id: String,
    /// Findings across all targets of the job.
    pub findings: Vec<Finding>,
    /// Raw backend output, as a JSON string.
    pub raw_findings: String,
}

impl JobResult {
    /// Attaches the worker identity, producing the document posted to the engine.
    pub fn into_submission(self, identity: &WorkerIdentity) -> ResultSubmission {
        ResultSubmission {
            findings: self.findings,
            raw_findings: self.raw_findings,
            scanner_id: identity.worker_id.clone(),
            scanner_type: identity.scanner_type.clone(),
        }
    }
}

/// A job that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// Id of the failed job.
    pub job_id: String,
    /// Short error message.
    pub error_message: String,
    /// Longer details, may be empty.
    pub error_details: String,
}

impl JobFailure {
    /// Creates a failure for the given job.
    pub fn new(
        job_id: impl Into<String>,
        error_message: impl Into<String>,
        error_details: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            error_message: error_message.into(),
            error_details: error_details.into(),
        }
    }

    /// Builds the document posted to the engine's failure endpoint.
    pub fn to_report(&self, identity: &WorkerIdentity) -> FailureReport {
        FailureReport {
            error_message: self.error_message.clone(),
            error_details: self.error_details.clone(),
            scanner_id: identity.worker_id.clone(),
        }
    }
}

/// Body of `POST /box/jobs/{jobId}/result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubmission {
    /// Findings of the job.
    pub findings: Vec<Finding>,
    /// Raw backend output.
    pub raw_findings: String,
    /// Worker id.
    pub scanner_id: String,
    /// Scanner kind.
    pub scanner_type: String,
}

/// Body of `POST /box/jobs/{jobId}/failure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    /// Short error message.
    pub error_message: String,
    /// Longer details.
    pub error_details: String,
    /// Worker id.
    pub scanner_id: String,
}
