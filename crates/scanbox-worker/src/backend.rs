use async_trait::async_trait;
use scanbox_core::{Finding, ScanboxResult, SelfTestResult, Target};

/// A pluggable scanner.
///
/// The harness knows nothing about how findings are produced; it only calls
/// [`self_test`](ScanBackend::self_test) once at startup and
/// [`scan`](ScanBackend::scan) once per target.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Checks that the backend is usable. Run once; a failed self-test marks
    /// the worker unhealthy for its whole lifetime.
    async fn self_test(&self) -> SelfTestResult;

    /// Scans a single target. Every returned finding must carry a fresh id.
    async fn scan(&self, target: &Target) -> ScanboxResult<Vec<Finding>>;
}
