// crates/substrate-store-sqlite/src/errors.rs
// ============================================================================
// Module: SQLite Store Errors
// Description: Error taxonomy for the SQLite-backed stores.
// Purpose: Translate rusqlite/IO failures into the shared AdapterError contract.
// Dependencies: substrate-core, thiserror
// ============================================================================

use substrate_core::AdapterError;
use thiserror::Error;

/// `SQLite` store errors, convertible into [`AdapterError`] at the trait boundary.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error (path validation, directory creation).
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// An optimistic-concurrency check failed.
    #[error("version conflict: expected {expected_version:?}, current {current_version}")]
    VersionConflict {
        /// Version the caller expected.
        expected_version: Option<u64>,
        /// Actual current version.
        current_version: u64,
    },
    /// An append cursor was unknown or invalid.
    #[error("cursor invalid")]
    CursorInvalid,
}

impl From<SqliteStoreError> for AdapterError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => Self::Unavailable(message),
            SqliteStoreError::Corrupt(message) | SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::VersionConflict {
                expected_version,
                current_version,
            } => Self::VersionConflict {
                expected_version,
                current_version,
            },
            SqliteStoreError::CursorInvalid => Self::CursorInvalid,
        }
    }
}
