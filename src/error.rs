use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Sentinel for every operation that needs a live, probed connection.
    #[error("mongo client is not connected")]
    NotConnected,

    #[error("mongo driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("failed to serialize document: {0}")]
    FailedToSerializeDocument(String),

    #[error("expected to delete exactly one document, deleted {0}")]
    UnexpectedDeleteCount(u64),
}
