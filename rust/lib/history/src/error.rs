use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history record {0} not found")]
    NotFound(u64),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
