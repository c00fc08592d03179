//! Error types for storage operations

use thiserror::Error;

use super::backend::StorageArea;

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a storage area
#[derive(Debug, Error)]
pub enum BackendError {
    /// The host rejected a write because it would exceed a quota
    #[error("{area} storage quota exceeded: {message}")]
    QuotaExceeded { area: StorageArea, message: String },

    /// Underlying I/O failed
    #[error("{area} storage I/O error: {message}")]
    Io { area: StorageArea, message: String },

    /// Stored bytes could not be (de)serialized
    #[error("{area} storage serialization error: {message}")]
    Serialization { area: StorageArea, message: String },

    /// Key rejected by the backend
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

impl BackendError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::Io { .. } => "IO_ERROR",
            Self::Serialization { .. } => "PARSE_ERROR",
            Self::InvalidKey(_) => "INVALID_KEY",
        }
    }
}

/// Errors raised by the chunked record store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write was rejected by the backend even after chunking
    #[error(
        "Storage quota exceeded while saving '{record}' (~{approx_kb:.1} KB): {message}. \
         Reduce the number of tabs or switch to local storage"
    )]
    QuotaExceeded {
        record: String,
        approx_kb: f64,
        message: String,
    },

    /// The record needs more chunks than the configured ceiling allows
    #[error(
        "Record '{record}' (~{approx_kb:.1} KB) would need {chunk_count} chunks, \
         more than the limit of {limit}. Reduce the configuration size"
    )]
    ChunkLimitExceeded {
        record: String,
        chunk_count: usize,
        limit: usize,
        approx_kb: f64,
    },

    /// A chunked record is missing one of its chunks
    #[error("Record '{record}' is missing chunk {index}")]
    MissingChunk { record: String, index: usize },

    /// A structurally complete record does not decode to valid JSON
    #[error("Record '{record}' could not be parsed: {message}. The stored data may be corrupted; saving it again will replace it")]
    Parse { record: String, message: String },

    /// The value could not be serialized before writing
    #[error("Failed to serialize '{record}': {message}")]
    Serialize { record: String, message: String },

    /// The store was configured with unusable limits
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    /// Any other backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StoreError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } | Self::ChunkLimitExceeded { .. } => "QUOTA_EXCEEDED",
            Self::MissingChunk { .. } => "MISSING_CHUNK",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Serialize { .. } => "SERIALIZE_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Backend(e) => e.code(),
        }
    }

    /// Whether this is a quota-class failure worth a "reduce size" hint
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded { .. }
                | Self::ChunkLimitExceeded { .. }
                | Self::Backend(BackendError::QuotaExceeded { .. })
        )
    }
}

/// Bytes to kilobytes for human-readable messages
#[allow(clippy::cast_precision_loss)]
pub(crate) fn approx_kb(bytes: usize) -> f64 {
    bytes as f64 / 1024.0
}
