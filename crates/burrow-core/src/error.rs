use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("transaction error: {0}")]
    Txn(String),

    #[error("marshalling error: {0}")]
    Marshal(String),

    #[error("type registry error: {0}")]
    Registry(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// True when the error is the recoverable missing-key case reported by
    /// lookup operations.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
