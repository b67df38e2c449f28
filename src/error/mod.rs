use std::fmt::Display;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for the whole pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        key: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Execution error: {message}")]
    Execution {
        code: u16,
        message: String,
        asset: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Orchestration error: {message}")]
    Orchestration {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Crawl error: {message}")]
    Crawl {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Data error: {message}")]
    Data {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PipelineError {
    /// Create a configuration error with specific code and field
    pub fn config_with_code(code: u16, message: impl Into<String>, field: Option<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Create a storage error with specific code and object key
    pub fn storage_with_code(code: u16, message: impl Into<String>, key: Option<String>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            key,
            source: None,
        }
    }

    /// Create an execution error with default code
    pub fn execution(message: impl Into<String>) -> Self {
        Self::execution_with_code(ErrorCode::EXEC_GENERIC, message)
    }

    /// Create an execution error not tied to one asset
    pub fn execution_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Execution {
            code,
            message: message.into(),
            asset: None,
            source: None,
        }
    }

    /// Create an execution error attributed to an asset
    pub fn asset_failed(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            code: ErrorCode::EXEC_ASSET_FAILED,
            message: message.into(),
            asset: Some(asset.into()),
            source: None,
        }
    }

    /// Create an orchestration error with default code
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::orchestration_with_code(ErrorCode::ORCH_GENERIC, message)
    }

    /// Create an orchestration error with specific code
    pub fn orchestration_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Orchestration {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a crawl error with specific code
    pub fn crawl_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Crawl {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a data error with specific code
    pub fn data_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Data {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Execution { source: src, .. }
            | Self::Orchestration { source: src, .. }
            | Self::Crawl { source: src, .. }
            | Self::Data { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Storage { message, .. }
            | Self::Execution { message, .. }
            | Self::Orchestration { message, .. }
            | Self::Crawl { message, .. }
            | Self::Data { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Storage { .. } => 4,
            Self::Execution { .. } => 5,
            Self::Orchestration { .. } => 6,
            Self::Crawl { .. } => 7,
            Self::Data { .. } => 8,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Storage { code, .. }
            | Self::Execution { code, .. }
            | Self::Orchestration { code, .. }
            | Self::Crawl { code, .. }
            | Self::Data { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, field, .. } => match field {
                Some(f) => format!("Configuration problem in '{}': {}", f, message),
                None => format!("Configuration problem: {}", message),
            },
            Self::Storage { message, key, .. } => match key {
                Some(k) => format!("Storage error at {}: {}", k, message),
                None => format!("Storage error: {}", message),
            },
            Self::Execution { message, asset, .. } => match asset {
                Some(a) => format!("Asset '{}' failed: {}", a, message),
                None => format!("Execution error: {}", message),
            },
            Self::Orchestration { message, .. } => format!("Orchestration error: {}", message),
            Self::Crawl { message, .. } => format!("Crawl error: {}", message),
            Self::Data { message, .. } => format!("Data error: {}", message),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::storage_with_code(ErrorCode::STORAGE_IO_ERROR, err.to_string(), None)
            .with_source(err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::storage_with_code(
            ErrorCode::STORAGE_SERIALIZATION_ERROR,
            err.to_string(),
            None,
        )
        .with_source(err)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::data_with_code(ErrorCode::DATA_CSV_ERROR, err.to_string()).with_source(err)
    }
}

impl From<polars::prelude::PolarsError> for PipelineError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        PipelineError::data_with_code(ErrorCode::DATA_PARQUET_ERROR, err.to_string())
            .with_source(err)
    }
}

/// Type alias for Results using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
