//! In-memory data files for testing.

use crate::encoding::{AccessMode, EncodedFile, Encoding, EncodingKind};
use crate::error::{StorageError, StorageResult};
use dirfile_types::DataType;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A shared map of data file path to raw bytes.
///
/// Cloning the store shares the underlying map, so a test can keep a clone
/// and inspect what a session wrote.
///
/// # Example
///
/// ```rust
/// use dirfile_storage::MemoryStore;
/// use std::path::Path;
///
/// let store = MemoryStore::new();
/// store.insert("dirfile/data", vec![1, 2, 3]);
/// assert_eq!(store.get(Path::new("dirfile/data")).unwrap(), vec![1, 2, 3]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    files: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a file.
    pub fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.write().insert(path.into(), data);
    }

    /// Returns a copy of a file's bytes.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().get(path).cloned()
    }

    /// True when the file exists.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }
}

/// An encoding whose data files live in a [`MemoryStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryEncoding {
    store: MemoryStore,
}

impl MemoryEncoding {
    /// Creates an encoding over `store`.
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl Encoding for MemoryEncoding {
    fn kind(&self) -> EncodingKind {
        EncodingKind::Memory
    }

    fn suffix(&self) -> &'static str {
        ""
    }

    fn exists(&self, base: &Path) -> bool {
        self.store.contains(&self.data_path(base))
    }

    fn open(
        &self,
        base: &Path,
        mode: AccessMode,
        create: bool,
    ) -> StorageResult<Box<dyn EncodedFile>> {
        let key = self.data_path(base);
        if !self.store.contains(&key) {
            if !(create && mode.is_writable()) {
                return Err(StorageError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such data file: {}", key.display()),
                )));
            }
            self.store.insert(key.clone(), Vec::new());
        }

        Ok(Box::new(MemoryFile {
            store: self.store.clone(),
            key,
            pos: 0,
            writable: mode.is_writable(),
        }))
    }
}

/// An open in-memory data file.
#[derive(Debug)]
pub struct MemoryFile {
    store: MemoryStore,
    key: PathBuf,
    pos: usize,
    writable: bool,
}

impl EncodedFile for MemoryFile {
    fn encoding_name(&self) -> &'static str {
        EncodingKind::Memory.name()
    }

    fn seek(&mut self, sample: u64, ty: DataType, _writing: bool) -> StorageResult<()> {
        self.pos = usize::try_from(sample)
            .ok()
            .and_then(|s| s.checked_mul(ty.size()))
            .ok_or_else(|| StorageError::out_of_range(sample))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], ty: DataType, count: usize) -> StorageResult<usize> {
        let files = self.store.files.read();
        let data = files.get(&self.key).map(Vec::as_slice).unwrap_or(&[]);
        let start = self.pos.min(data.len());
        let len = ty
            .bytes_for(count)
            .min(buf.len())
            .min(data.len() - start);
        let len = len - len % ty.size();
        buf[..len].copy_from_slice(&data[start..start + len]);
        self.pos = start + len;
        Ok(len / ty.size())
    }

    fn write(&mut self, buf: &[u8], ty: DataType, count: usize) -> StorageResult<usize> {
        if !self.writable {
            return Err(StorageError::ReadOnly {
                path: self.key.display().to_string(),
            });
        }
        let len = ty.bytes_for(count).min(buf.len());
        let mut files = self.store.files.write();
        let data = files.entry(self.key.clone()).or_default();
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| StorageError::OutOfRange(format!("byte {}", self.pos)))?;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[self.pos..end].copy_from_slice(&buf[..len]);
        self.pos = end;
        Ok(len / ty.size())
    }

    fn size(&mut self, ty: DataType) -> StorageResult<u64> {
        let len = self.store.files.read().get(&self.key).map_or(0, Vec::len);
        Ok((len / ty.size()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirfile_types::{from_bytes, to_bytes};

    #[test]
    fn write_is_visible_through_store() {
        let store = MemoryStore::new();
        let enc = MemoryEncoding::new(store.clone());

        let mut f = enc
            .open(Path::new("d/data"), AccessMode::ReadWrite, true)
            .unwrap();
        f.seek(1, DataType::UInt16, true).unwrap();
        f.write(&to_bytes(&[9u16]), DataType::UInt16, 1).unwrap();

        let bytes = store.get(Path::new("d/data")).unwrap();
        assert_eq!(from_bytes::<u16>(&bytes), vec![0, 9]);
    }

    #[test]
    fn read_stops_at_end() {
        let store = MemoryStore::new();
        store.insert("d/data", vec![1, 2, 3]);
        let enc = MemoryEncoding::new(store);

        let mut f = enc
            .open(Path::new("d/data"), AccessMode::ReadOnly, false)
            .unwrap();
        f.seek(1, DataType::UInt8, false).unwrap();
        let mut buf = vec![0u8; 8];
        assert_eq!(f.read(&mut buf, DataType::UInt8, 8).unwrap(), 2);
        assert_eq!(&buf[..2], &[2, 3]);
    }

    #[test]
    fn seek_beyond_addressable_bytes_is_out_of_range() {
        let store = MemoryStore::new();
        store.insert("d/data", vec![0; 8]);
        let enc = MemoryEncoding::new(store);

        let mut f = enc
            .open(Path::new("d/data"), AccessMode::ReadOnly, false)
            .unwrap();
        let result = f.seek(u64::MAX / 2, DataType::Complex128, false);
        assert!(matches!(result, Err(StorageError::OutOfRange(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let enc = MemoryEncoding::default();
        assert!(!enc.exists(Path::new("d/none")));
        let result = enc.open(Path::new("d/none"), AccessMode::ReadOnly, false);
        assert!(matches!(result, Err(e) if e.is_not_found()));
    }
}
