//! Error types for store operations.
//!
//! Absence is never an error: a missing record or collection is reported
//! through `Ok(None)` / an empty `Vec`, so every variant here is a genuine
//! failure of the call that produced it.

use thiserror::Error;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be opened or configured.
    #[error("failed to open store {conn:?}: {source}")]
    Connect {
        /// The connection descriptor that was used.
        conn: String,
        /// The underlying engine error.
        #[source]
        source: rusqlite::Error,
    },

    /// An object could not be serialized.
    #[error("failed to encode object: {0}")]
    Encode(#[source] serde_json::Error),

    /// A stored payload could not be decoded into the requested type.
    #[error("failed to decode {collection}/{id}: {source}")]
    Decode {
        /// The collection the payload was read from.
        collection: String,
        /// The record identifier.
        id: String,
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// Creating the collection's table failed after a first failure.
    #[error("failed to provision collection {collection}: {source}")]
    Provision {
        /// The collection being provisioned.
        collection: String,
        /// The underlying engine error.
        #[source]
        source: rusqlite::Error,
    },

    /// The statement failed again after the collection was provisioned.
    #[error("operation on collection {collection} failed after provisioning: {source}")]
    AfterProvision {
        /// The collection the statement targeted.
        collection: String,
        /// The error from the retried statement.
        #[source]
        source: rusqlite::Error,
    },

    /// An engine failure that was not eligible for provisioning.
    #[error("storage engine error: {0}")]
    Engine(#[from] rusqlite::Error),

    /// The caller's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Creates a decode error for a record.
    pub fn decode(
        collection: impl Into<String>,
        id: impl Into<String>,
        source: serde_json::Error,
    ) -> Self {
        StoreError::Decode {
            collection: collection.into(),
            id: id.into(),
            source,
        }
    }

    /// Returns a stable, machine-readable code for the error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            StoreError::Connect { .. } => "connect",
            StoreError::Encode(_) => "encode",
            StoreError::Decode { .. } => "decode",
            StoreError::Provision { .. } => "provision",
            StoreError::AfterProvision { .. } => "after_provision",
            StoreError::Engine(_) => "engine",
            StoreError::Cancelled => "cancelled",
            StoreError::DeadlineExceeded => "deadline_exceeded",
            StoreError::Config(_) => "config",
        }
    }

    /// Returns true if the error came from the caller's context rather than
    /// the backend.
    #[must_use]
    pub fn is_context(&self) -> bool {
        matches!(self, StoreError::Cancelled | StoreError::DeadlineExceeded)
    }

    /// Returns the engine error underneath this error, if any.
    pub fn engine_error(&self) -> Option<&rusqlite::Error> {
        match self {
            StoreError::Connect { source, .. }
            | StoreError::Provision { source, .. }
            | StoreError::AfterProvision { source, .. }
            | StoreError::Engine(source) => Some(source),
            _ => None,
        }
    }

    /// Returns true if the engine aborted the statement through an interrupt.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.engine_error()
            .and_then(rusqlite::Error::sqlite_error_code)
            .is_some_and(|code| code == rusqlite::ErrorCode::OperationInterrupted)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
