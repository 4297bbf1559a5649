//! Error types for dirfile core.

use dirfile_storage::StorageError;
use dirfile_types::TypeError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while evaluating or storing fields.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No entry (or alias) has this field code.
    #[error("unknown field: {code}")]
    UnknownField {
        /// The field code looked up.
        code: String,
    },

    /// The operation is meaningless for this kind of field.
    #[error("bad field type for {code}: {message}")]
    UnsupportedFieldType {
        /// The field involved.
        code: String,
        /// What was attempted.
        message: String,
    },

    /// The field cannot be written because its transform has no inverse.
    #[error("field {code} is not writable")]
    NonInvertibleWrite {
        /// The field written.
        code: String,
    },

    /// Resolution went deeper than the recursion ceiling.
    #[error("recursion limit reached resolving {code}")]
    RecursionLimit {
        /// The field at which the ceiling was hit.
        code: String,
    },

    /// A sample offset or index is out of range.
    #[error("range error: {message}")]
    RangeError {
        /// Description of the offending range.
        message: String,
    },

    /// Writing is not permitted.
    #[error("access denied: {message}")]
    AccessDenied {
        /// Why the write was refused.
        message: String,
    },

    /// No data file exists under any known encoding.
    #[error("cannot determine encoding of {path}")]
    UnresolvedEncoding {
        /// Base path of the data file.
        path: String,
    },

    /// The encoding lacks a required primitive.
    #[error("{encoding} encoding does not support {operation}")]
    UnsupportedOperation {
        /// The encoding involved.
        encoding: String,
        /// The missing primitive.
        operation: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An invariant of the entry table was violated.
    #[error("internal error: {message}")]
    InternalError {
        /// Description of the violation.
        message: String,
    },

    /// A declared or requested type is outside the lattice.
    #[error("unsupported data type: {name}")]
    UnsupportedType {
        /// The offending type.
        name: String,
    },

    /// An entry's parameters are malformed.
    #[error("invalid entry {code}: {message}")]
    InvalidEntry {
        /// The entry involved.
        code: String,
        /// What is wrong with it.
        message: String,
    },

    /// A caller buffer cannot hold the requested window.
    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes supplied.
        actual: usize,
    },
}

/// The kind of a [`CoreError`], without its details.
///
/// Returned by the last-error accessors of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`CoreError::UnknownField`].
    UnknownField,
    /// See [`CoreError::UnsupportedFieldType`].
    UnsupportedFieldType,
    /// See [`CoreError::NonInvertibleWrite`].
    NonInvertibleWrite,
    /// See [`CoreError::RecursionLimit`].
    RecursionLimit,
    /// See [`CoreError::RangeError`].
    RangeError,
    /// See [`CoreError::AccessDenied`].
    AccessDenied,
    /// See [`CoreError::UnresolvedEncoding`].
    UnresolvedEncoding,
    /// See [`CoreError::UnsupportedOperation`].
    UnsupportedOperation,
    /// See [`CoreError::Io`].
    Io,
    /// See [`CoreError::InternalError`].
    InternalError,
    /// See [`CoreError::UnsupportedType`].
    UnsupportedType,
    /// See [`CoreError::InvalidEntry`].
    InvalidEntry,
    /// See [`CoreError::BufferTooSmall`].
    BufferTooSmall,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl CoreError {
    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownField { .. } => ErrorKind::UnknownField,
            Self::UnsupportedFieldType { .. } => ErrorKind::UnsupportedFieldType,
            Self::NonInvertibleWrite { .. } => ErrorKind::NonInvertibleWrite,
            Self::RecursionLimit { .. } => ErrorKind::RecursionLimit,
            Self::RangeError { .. } => ErrorKind::RangeError,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::UnresolvedEncoding { .. } => ErrorKind::UnresolvedEncoding,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            Self::Io(_) => ErrorKind::Io,
            Self::InternalError { .. } => ErrorKind::InternalError,
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::InvalidEntry { .. } => ErrorKind::InvalidEntry,
            Self::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
        }
    }

    /// True when the error means a data file does not exist yet.
    #[must_use]
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }

    /// Creates an unknown field error.
    pub fn unknown_field(code: impl Into<String>) -> Self {
        Self::UnknownField { code: code.into() }
    }

    /// Creates a bad field type error.
    pub fn unsupported_field_type(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedFieldType {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a non-invertible write error.
    pub fn non_invertible(code: impl Into<String>) -> Self {
        Self::NonInvertibleWrite { code: code.into() }
    }

    /// Creates a recursion limit error.
    pub fn recursion_limit(code: impl Into<String>) -> Self {
        Self::RecursionLimit { code: code.into() }
    }

    /// Creates a range error.
    pub fn range(message: impl Into<String>) -> Self {
        Self::RangeError {
            message: message.into(),
        }
    }

    /// Creates an access denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates an unresolved encoding error.
    pub fn unresolved_encoding(path: impl Into<String>) -> Self {
        Self::UnresolvedEncoding { path: path.into() }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported_operation(encoding: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            encoding: encoding.into(),
            operation: operation.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Creates an invalid entry error.
    pub fn invalid_entry(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => Self::Io(e),
            StorageError::Unsupported {
                encoding,
                operation,
            } => Self::unsupported_operation(encoding, operation),
            StorageError::ReadOnly { path } => {
                Self::access_denied(format!("data file opened read-only: {path}"))
            }
            StorageError::Corrupted(message) => {
                Self::Io(io::Error::new(io::ErrorKind::InvalidData, message))
            }
            StorageError::OutOfRange(message) => Self::range(message),
            StorageError::Type(e) => e.into(),
        }
    }
}

impl From<TypeError> for CoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::UnsupportedType { name } => Self::UnsupportedType { name },
            TypeError::BufferTooSmall { needed, actual } => {
                Self::BufferTooSmall { needed, actual }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_unsupported_maps_to_unsupported_operation() {
        let err: CoreError = StorageError::unsupported("text", "write").into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert_eq!(err.to_string(), "text encoding does not support write");
    }

    #[test]
    fn not_found_is_missing_data() {
        let err: CoreError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_missing_data());
        assert!(!CoreError::range("x").is_missing_data());
    }

    #[test]
    fn type_errors_map() {
        let err: CoreError = TypeError::unsupported_type("0x3").into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    }
}
