use thiserror::Error;

/// §4.7/§7 runner-side failure taxonomy. Every variant maps to
/// `success = false` when it terminates a container invocation, so the
/// Engine can still progress toward finalization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("agent container image unavailable")]
    ImageUnavailable,

    #[error("agent invocation timed out")]
    InvokeTimeout,

    #[error("agent container error: {0}")]
    ContainerError(String),

    #[error("agent output failed to decode")]
    Malformed,

    #[error("chain client error: {0}")]
    Chain(String),
}
