//! Error types for the object storage layer

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::error::{ErrorCode, PipelineError};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object key is not acceptable for the backend
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The remote service rejected or failed the request
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend could not be configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Lock file could not be taken or released
    #[error("Lock error: {0}")]
    Lock(String),

    /// Gave up waiting for a lock
    #[error("Timed out after {0:?} waiting for a lock")]
    Timeout(Duration),
}

impl StorageError {
    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    pub fn invalid_key<E: fmt::Display>(key: E) -> Self {
        Self::InvalidKey(key.to_string())
    }

    pub fn backend<E: fmt::Display>(msg: E) -> Self {
        Self::Backend(msg.to_string())
    }

    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    pub fn connection<E: fmt::Display>(msg: E) -> Self {
        Self::Connection(msg.to_string())
    }

    pub fn lock<E: fmt::Display>(msg: E) -> Self {
        Self::Lock(msg.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convert StorageError to PipelineError
impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        let (code, key) = match &err {
            StorageError::Io(_) => (ErrorCode::STORAGE_IO_ERROR, None),
            StorageError::NotFound(key) => (ErrorCode::STORAGE_NOT_FOUND, Some(key.clone())),
            StorageError::InvalidKey(key) => (ErrorCode::STORAGE_GENERIC, Some(key.clone())),
            StorageError::Backend(_) => (ErrorCode::STORAGE_BACKEND_ERROR, None),
            StorageError::Configuration(_) => (ErrorCode::CONFIG_INVALID_VALUE, None),
            StorageError::Connection(_) => (ErrorCode::STORAGE_BACKEND_ERROR, None),
            StorageError::Lock(_) | StorageError::Timeout(_) => (ErrorCode::STORAGE_LOCK_FAILED, None),
        };

        PipelineError::storage_with_code(code, err.to_string(), key).with_source(err)
    }
}
