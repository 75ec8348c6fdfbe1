//! Error types for reconciliation, pipes and dispatch.

/// Errors raised inside a single pipe's lifecycle call.
///
/// These never escape the [`crate::Dispatcher`]; they are logged there and
/// swallowed so sibling pipes keep running.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// Transport-level failure talking to the sink.
    #[error("{sink}: delivery failed: {message}")]
    Delivery { sink: String, message: String },

    /// The sink answered but refused the report.
    #[error("{sink}: report rejected ({status}): {message}")]
    Rejected {
        sink: String,
        status: String,
        message: String,
    },

    /// Delivery did not complete within the configured bound.
    #[error("{sink}: delivery timed out after {millis}ms")]
    Timeout { sink: String, millis: u64 },

    /// Local I/O failure (file-writing sinks).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Report body could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Sink configuration is present but unusable.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl From<reqwest::Error> for PipeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Delivery {
            sink: err
                .url()
                .and_then(|u| u.host_str().map(String::from))
                .unwrap_or_else(|| "http".to_string()),
            message: err.to_string(),
        }
    }
}

impl PipeError {
    pub(crate) fn timeout(sink: impl Into<String>, limit: std::time::Duration) -> Self {
        Self::Timeout {
            sink: sink.into(),
            millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Result type for pipe lifecycle calls.
pub type PipeResult<T> = Result<T, PipeError>;

/// A test update that cannot be matched to an identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Title absent or blank; the update is dropped.
    #[error("test update has no title (suite: {suite:?})")]
    MissingTitle { suite: Option<String> },
}

/// Lifecycle misuse on the dispatcher. The only error the core surfaces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("prepare_run called twice")]
    AlreadyPrepared,

    #[error("{call} called after finish_run")]
    AlreadyFinished { call: &'static str },
}
