//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while working with resource stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store was invalidated and can no longer be used.
    #[error("store '{0}' is unavailable")]
    Unavailable(PathBuf),

    /// SQLite reported an error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A newly created store did not pass initialization.
    #[error("store '{0}' is missing required metadata")]
    NotInitialized(PathBuf),

    /// Failed to create a directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a directory.
    #[error("failed to read directory '{path}': {source}")]
    ReadDir {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to delete a file.
    #[error("failed to delete file '{path}': {source}")]
    DeleteFile {
        /// The path that could not be deleted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
