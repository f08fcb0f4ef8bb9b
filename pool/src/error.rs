use thiserror::Error;

/// Errors surfaced by the job and share pipeline.
///
/// Share grading outcomes (`JobNotFound`, `InvalidSolution`, `LowDifficulty`)
/// are verdicts, not errors; see `shares::ShareStatus`.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Upstream template could not be parsed; the notification is dropped.
    #[error("malformed template: {0}")]
    MalformedTemplate(String),

    /// Outbound channel refused a solved-share record.
    #[error("failed to publish solved share: {0}")]
    PublishFailure(String),

    /// Connection refused before a session was created.
    #[error("session rejected: {0}")]
    SessionRejected(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PoolError>;
