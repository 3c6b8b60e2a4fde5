//! HTTP status endpoint of a scanbox worker.
//!
//! Serves `GET /status`, a [`ScannerStatus`](scanbox_core::ScannerStatus)
//! document rebuilt from the live [`StatusTracker`](scanbox_core::StatusTracker)
//! on every request. The response is `200` while the backend self-test has
//! passed and `500` otherwise.

/// Router and server for `GET /status`.
pub mod server;

pub use server::{StatusServer, StatusState};
