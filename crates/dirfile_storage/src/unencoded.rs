//! Raw binary data files.

use crate::encoding::{AccessMode, EncodedFile, Encoding, EncodingKind};
use crate::error::{StorageError, StorageResult};
use dirfile_types::DataType;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The unencoded encoding: samples stored back to back in a binary file
/// named after the field, with no suffix.
///
/// # Example
///
/// ```no_run
/// use dirfile_storage::{AccessMode, Encoding, Unencoded};
/// use dirfile_types::DataType;
/// use std::path::Path;
///
/// let mut file = Unencoded.open(Path::new("dirfile/data"), AccessMode::ReadWrite, true).unwrap();
/// file.seek(0, DataType::UInt8, true).unwrap();
/// file.write(&[1, 2, 3], DataType::UInt8, 3).unwrap();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Unencoded;

impl Encoding for Unencoded {
    fn kind(&self) -> EncodingKind {
        EncodingKind::Unencoded
    }

    fn suffix(&self) -> &'static str {
        ""
    }

    fn open(
        &self,
        base: &Path,
        mode: AccessMode,
        create: bool,
    ) -> StorageResult<Box<dyn EncodedFile>> {
        let path = self.data_path(base);
        let file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .create(create && mode.is_writable())
            .truncate(false)
            .open(&path)?;

        Ok(Box::new(UnencodedFile {
            path,
            file,
            writable: mode.is_writable(),
        }))
    }
}

/// An open raw binary data file.
#[derive(Debug)]
pub struct UnencodedFile {
    path: PathBuf,
    file: File,
    writable: bool,
}

impl UnencodedFile {
    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EncodedFile for UnencodedFile {
    fn encoding_name(&self) -> &'static str {
        EncodingKind::Unencoded.name()
    }

    fn seek(&mut self, sample: u64, ty: DataType, _writing: bool) -> StorageResult<()> {
        let offset = sample
            .checked_mul(ty.size() as u64)
            .ok_or_else(|| StorageError::out_of_range(sample))?;
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], ty: DataType, count: usize) -> StorageResult<usize> {
        let want = ty.bytes_for(count).min(buf.len());
        let mut filled = 0;
        while filled < want {
            match self.file.read(&mut buf[filled..want]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled / ty.size())
    }

    fn write(&mut self, buf: &[u8], ty: DataType, count: usize) -> StorageResult<usize> {
        if !self.writable {
            return Err(StorageError::ReadOnly {
                path: self.path.display().to_string(),
            });
        }
        let len = ty.bytes_for(count).min(buf.len());
        self.file.write_all(&buf[..len])?;
        Ok(len / ty.size())
    }

    fn size(&mut self, ty: DataType) -> StorageResult<u64> {
        Ok(self.file.metadata()?.len() / ty.size() as u64)
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.writable {
            self.file.flush()?;
            self.file.sync_data()?;
        }
        Ok(())
    }
}
