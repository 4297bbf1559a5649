//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The encoding does not implement the requested primitive.
    #[error("{encoding} encoding does not support {operation}")]
    Unsupported {
        /// The encoding that was asked.
        encoding: &'static str,
        /// The missing primitive (`open`, `seek`, `read`, `write`, ...).
        operation: &'static str,
    },

    /// The file handle is not open for writing.
    #[error("data file not open for writing: {path}")]
    ReadOnly {
        /// Path of the data file.
        path: String,
    },

    /// The data file contents cannot be decoded.
    #[error("data file corrupted: {0}")]
    Corrupted(String),

    /// A sample position does not fit the file's address space.
    #[error("sample offset out of range: {0}")]
    OutOfRange(String),

    /// A sample type error surfaced while coding samples.
    #[error("type error: {0}")]
    Type(#[from] dirfile_types::TypeError),
}

impl StorageError {
    /// Creates an unsupported-operation error.
    pub fn unsupported(encoding: &'static str, operation: &'static str) -> Self {
        Self::Unsupported {
            encoding,
            operation,
        }
    }

    /// Creates an out-of-range error for sample `sample`.
    pub fn out_of_range(sample: u64) -> Self {
        Self::OutOfRange(format!("sample {sample}"))
    }

    /// True when the error means the data file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}
