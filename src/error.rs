use serde::Serialize;
use thiserror::Error;

use crate::models::Operation;

/// Coarse classification of a [`TransferError`], stable for UI and test code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    BackendError,
    TransportError,
    IoError,
    DecodeError,
    EncodeError,
    Busy,
    Aborted,
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Storage error {code} (HTTP {status}): {message}")]
    Backend {
        code: String,
        status: u16,
        message: String,
    },

    #[error("Could not reach storage: {0}")]
    Transport(String),

    #[error("Local I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("{0} already in progress")]
    Busy(Operation),

    /// A step panicked; the payload message is kept when it is a string.
    #[error("{operation} aborted unexpectedly: {message}")]
    Aborted {
        operation: Operation,
        message: String,
    },
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::InvalidInput(_) => ErrorKind::InvalidInput,
            TransferError::NotFound { .. } => ErrorKind::NotFound,
            TransferError::Backend { .. } => ErrorKind::BackendError,
            TransferError::Transport(_) => ErrorKind::TransportError,
            TransferError::Io(_) => ErrorKind::IoError,
            TransferError::Decode(_) => ErrorKind::DecodeError,
            TransferError::Encode(_) => ErrorKind::EncodeError,
            TransferError::Busy(_) => ErrorKind::Busy,
            TransferError::Aborted { .. } => ErrorKind::Aborted,
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        TransferError::InvalidInput(msg.into())
    }
}

pub type TransferResult<T> = Result<T, TransferError>;
