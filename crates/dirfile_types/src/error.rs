//! Error types for the types crate.

use thiserror::Error;

/// Result type for type lattice operations.
pub type TypeResult<T> = Result<T, TypeError>;

/// Errors that can occur while interpreting or converting sample buffers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The type code or name does not name a member of the lattice.
    #[error("unsupported data type: {name}")]
    UnsupportedType {
        /// The offending code or name, as text.
        name: String,
    },

    /// A buffer is too short for the requested number of samples.
    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        actual: usize,
    },
}

impl TypeError {
    /// Create an unsupported type error.
    pub fn unsupported_type(name: impl Into<String>) -> Self {
        Self::UnsupportedType { name: name.into() }
    }

    /// Create a buffer too small error.
    pub fn buffer_too_small(needed: usize, actual: usize) -> Self {
        Self::BufferTooSmall { needed, actual }
    }
}
