use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuorumError>;

#[derive(Debug, Error)]
pub enum QuorumError {
    #[error("storage error during {operation}: {details}")]
    StorageError { operation: String, details: String },

    #[error("remote fetch failed for {entity}: {details}")]
    RemoteFetchFailed { entity: String, details: String },

    #[error("claim attempts exhausted for {entity} after {attempts} attempts with no row observed")]
    ClaimExhausted { entity: String, attempts: u32 },

    #[error("invalid entity key: {0}")]
    InvalidEntityKey(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(u64),

    #[error("transaction group not found: {0}")]
    GroupNotFound(u64),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("submission failed: {0}")]
    SubmitFailed(String),

    #[error("{0}")]
    Message(String),
}

impl QuorumError {
    pub fn storage(operation: impl Into<String>, details: impl std::fmt::Display) -> Self {
        Self::StorageError { operation: operation.into(), details: details.to_string() }
    }
}

impl From<bincode::Error> for QuorumError {
    fn from(err: bincode::Error) -> Self {
        Self::DecodingError(err.to_string())
    }
}
