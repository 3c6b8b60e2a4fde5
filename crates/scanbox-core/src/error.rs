use thiserror::Error;

/// A convenience `Result` alias using [`ScanboxError`].
pub type ScanboxResult<T> = Result<T, ScanboxError>;

/// Top-level error type for the harness.
///
/// None of these terminate the process on their own. The engine-facing
/// variants are logged and folded into the status counters by the pipeline
/// stage that observed them.
#[derive(Error, Debug)]
pub enum ScanboxError {
    /// The engine could not be reached (connection refused, DNS, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The engine answered with a status code the harness cannot accept.
    #[error("Engine responded with {code} while {context}")]
    EngineProtocol {
        /// HTTP status code returned by the engine.
        code: u16,
        /// What the harness was doing when the code came back.
        context: String,
    },

    /// The engine sent a body that is not a valid document.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A payload produced by the harness could not be serialized.
    #[error("Encode error: {0}")]
    Encode(String),

    /// The scanning backend could not be initialized.
    #[error("Backend init error: {0}")]
    BackendInit(String),

    /// A scan of a single target failed.
    #[error("Scan error: {0}")]
    Scan(String),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanboxError {
    /// Shorthand for [`ScanboxError::EngineProtocol`].
    pub fn engine(code: u16, context: impl Into<String>) -> Self {
        Self::EngineProtocol {
            code,
            context: context.into(),
        }
    }

    /// Returns `true` when the error was produced after the engine answered.
    ///
    /// A malformed body still proves the engine is reachable.
    pub fn engine_reached(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
