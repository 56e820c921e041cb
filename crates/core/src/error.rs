//! Error types for tagstore
//!
//! This module defines the error taxonomy shared by every layer.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors split into two tiers:
//! - Initialization errors (`Connection`, `Schema`, `InvalidNamespace`, `Config`)
//!   abort `open` and leave no usable handle.
//! - Per-call errors (`Serialization`, `Query`, `RowDecode`) are ordinary
//!   results; the handle stays usable.

use thiserror::Error;

/// Result type alias for tagstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the tagged key-value store
#[derive(Debug, Error)]
pub enum Error {
    /// The backing engine could not be reached or opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// Creating the storage object or compiling an operation failed
    #[error("Schema error: {0}")]
    Schema(String),

    /// Encoding a caller value failed; nothing was written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing engine rejected or failed a per-call operation
    #[error("Query error: {0}")]
    Query(String),

    /// A stored value could not be decoded into the requested shape
    #[error("Row decode error for key {key:?}: {reason}")]
    RowDecode {
        /// Key of the offending record
        key: String,
        /// Underlying decode failure
        reason: String,
    },

    /// Namespace name cannot be used to derive a storage object name
    #[error("Invalid namespace {name:?}: {reason}")]
    InvalidNamespace {
        /// Rejected name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Store configuration could not be read or is invalid
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error belongs to the initialization tier.
    ///
    /// Initialization errors are never returned by per-call operations.
    pub fn is_init(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Schema(_) | Error::InvalidNamespace { .. } | Error::Config(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
