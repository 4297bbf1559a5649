//! Encoding contract.

use crate::error::{StorageError, StorageResult};
use dirfile_types::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How a data file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessMode {
    /// Reads only.
    #[default]
    ReadOnly,
    /// Reads and writes.
    ReadWrite,
}

impl AccessMode {
    /// True when writes are permitted.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// The on-disk encodings known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingKind {
    /// Raw native-layout binary samples.
    Unencoded,
    /// One ASCII sample per line.
    Text,
    /// Samples held in an in-process store.
    Memory,
}

impl EncodingKind {
    /// Lower-case name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unencoded => "unencoded",
            Self::Text => "text",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A factory for handles onto data files of one encoding.
///
/// Encodings are stateless: all per-file state lives in the
/// [`EncodedFile`] handle returned by [`Encoding::open`].
///
/// # Implementors
///
/// - [`super::Unencoded`] - raw binary files
/// - [`super::TextEncoding`] - ASCII text files
/// - [`super::MemoryEncoding`] - in-process store for tests
pub trait Encoding: Send + Sync {
    /// The kind this encoding implements.
    fn kind(&self) -> EncodingKind;

    /// Suffix appended to the data file base name.
    fn suffix(&self) -> &'static str;

    /// Full path of the data file for `base`.
    fn data_path(&self, base: &Path) -> PathBuf {
        let mut name = base.as_os_str().to_os_string();
        name.push(self.suffix());
        PathBuf::from(name)
    }

    /// True when a data file for `base` exists in this encoding.
    ///
    /// Used for auto-detection.
    fn exists(&self, base: &Path) -> bool {
        self.data_path(base).is_file()
    }

    /// Opens the data file for `base`.
    ///
    /// With `create` set a missing file is created (only meaningful in
    /// [`AccessMode::ReadWrite`]).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened, or `Unsupported`
    /// if the encoding cannot open files in `mode`.
    fn open(
        &self,
        base: &Path,
        mode: AccessMode,
        create: bool,
    ) -> StorageResult<Box<dyn EncodedFile>>;
}

/// An open data file.
///
/// Positions and counts are in samples of the type passed to each call.
/// Every primitive has a default that reports `Unsupported`, so an
/// encoding implements only what it can do.
///
/// # Invariants
///
/// - `read` returns fewer samples than requested only at end of file
/// - `seek` past the end of file for writing is legal and leaves a gap
///   that reads back as zeros
pub trait EncodedFile: Send {
    /// Name of the encoding, for error messages.
    fn encoding_name(&self) -> &'static str;

    /// True when samples are stored as their byte image, so the fragment's
    /// byte order applies to them. Encodings that store parsed values, such
    /// as text, return false.
    fn byte_oriented(&self) -> bool {
        true
    }

    /// Moves to sample `sample` of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error, or `Unsupported` if the encoding cannot seek.
    fn seek(&mut self, sample: u64, ty: DataType, writing: bool) -> StorageResult<()> {
        let _ = (sample, ty, writing);
        Err(StorageError::unsupported(self.encoding_name(), "seek"))
    }

    /// Reads up to `count` samples of `ty` into `buf` (native byte layout of
    /// the file), returning the number of whole samples read.
    ///
    /// # Errors
    ///
    /// Returns an I/O error, or `Unsupported` if the encoding cannot read.
    fn read(&mut self, buf: &mut [u8], ty: DataType, count: usize) -> StorageResult<usize> {
        let _ = (buf, ty, count);
        Err(StorageError::unsupported(self.encoding_name(), "read"))
    }

    /// Writes `count` samples of `ty` from `buf`, returning the number written.
    ///
    /// # Errors
    ///
    /// Returns an I/O error, or `Unsupported` if the encoding cannot write.
    fn write(&mut self, buf: &[u8], ty: DataType, count: usize) -> StorageResult<usize> {
        let _ = (buf, ty, count);
        Err(StorageError::unsupported(self.encoding_name(), "write"))
    }

    /// Number of whole samples of `ty` in the file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error, or `Unsupported` if the size cannot be determined.
    fn size(&mut self, ty: DataType) -> StorageResult<u64> {
        let _ = ty;
        Err(StorageError::unsupported(self.encoding_name(), "size"))
    }

    /// Pushes pending writes to the backing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    /// Releases the handle, flushing pending writes first.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    fn close(mut self: Box<Self>) -> StorageResult<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl EncodedFile for Bare {
        fn encoding_name(&self) -> &'static str {
            "bare"
        }
    }

    #[test]
    fn missing_primitives_report_unsupported() {
        let mut f = Bare;
        let mut buf = [0u8; 4];
        assert!(matches!(
            f.read(&mut buf, DataType::UInt8, 4),
            Err(StorageError::Unsupported {
                operation: "read",
                ..
            })
        ));
        assert!(matches!(
            f.write(&buf, DataType::UInt8, 4),
            Err(StorageError::Unsupported {
                operation: "write",
                ..
            })
        ));
        assert!(f.flush().is_ok());
        assert!(f.byte_oriented());
    }

    #[test]
    fn access_mode_writable() {
        assert!(AccessMode::ReadWrite.is_writable());
        assert!(!AccessMode::ReadOnly.is_writable());
    }
}
