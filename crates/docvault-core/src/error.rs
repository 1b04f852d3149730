use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {id}")]
    NotFound { id: String },

    #[error("Dimension mismatch for '{id}': expected {expected}, got {actual}")]
    DimensionMismatch { id: String, expected: usize, actual: usize },

    #[error("Embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    #[error("Embedding timed out ({provider}) after {timeout_ms} ms")]
    EmbeddingTimeout { provider: String, timeout_ms: u64 },

    #[error("Query text is empty")]
    EmptyQuery,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse error classification, stable across transports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidConfig,
    NotFound,
    DimensionMismatch,
    Embedding,
    EmbeddingTimeout,
    EmptyQuery,
    InvalidArgument,
    Snapshot,
    Io,
}

impl Error {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Embedding { provider: provider.into(), message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::Embedding { .. } => ErrorKind::Embedding,
            Self::EmbeddingTimeout { .. } => ErrorKind::EmbeddingTimeout,
            Self::EmptyQuery => ErrorKind::EmptyQuery,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Snapshot(_) => ErrorKind::Snapshot,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// True for errors caused by the caller's input rather than the archive.
    pub fn is_caller_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::EmptyQuery | ErrorKind::InvalidArgument)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
