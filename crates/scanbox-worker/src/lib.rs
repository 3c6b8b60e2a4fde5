//! The concurrent pipeline of a scanbox worker.
//!
//! ```text
//! JobPoller -> jobs -> ScanWorker -> results  -> ResultSubmitter  -> engine
//!                                 -> failures -> FailureSubmitter -> engine
//! ```
//!
//! Each stage runs as its own tokio task and only shares the
//! [`StatusTracker`](scanbox_core::StatusTracker) and the queues between them.
//! [`Harness`] wires the stages together and owns shutdown.
//!
//! # Main types
//!
//! - [`JobPoller`]: Locks jobs from the engine and hands them to the worker.
//! - [`PollPolicy`]: Delay between lock attempts, with backoff on errors.
//! - [`ScanWorker`]: Runs a [`ScanBackend`] over every target of a job.
//! - [`ResultSubmitter`] / [`FailureSubmitter`]: Deliver outcomes to the engine.
//! - [`CommandEnumerator`]: Subdomain backend driving an external enumerator.

/// The scanning backend seam.
pub mod backend;
/// Wiring and lifecycle of all pipeline stages.
pub mod harness;
/// Result and failure delivery.
pub mod pipeline;
/// Delay policy between lock attempts.
pub mod policy;
/// Job acquisition loop.
pub mod poller;
/// Job execution against a backend.
pub mod scan;
/// Subdomain enumeration backend.
pub mod subdomain;

#[cfg(test)]
mod testing;

pub use backend::ScanBackend;
pub use harness::{Harness, HarnessHandle, HarnessSettings};
pub use pipeline::{FailureSubmitter, ResultSubmitter};
pub use policy::{PollDelay, PollPolicy};
pub use poller::JobPoller;
pub use scan::ScanWorker;
pub use subdomain::{CommandEnumerator, EnumeratorConfig, ScanOptions, SubdomainRecord};
