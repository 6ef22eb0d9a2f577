use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("unknown decision: {0}")]
    UnknownDecision(String),

    #[error("unknown breakpoint source: {0}")]
    UnknownSource(String),
}
