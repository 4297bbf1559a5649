//! Raw channels: lazily opened data files of RAW fields.

use crate::error::{CoreError, CoreResult};
use crate::fragment::Fragment;
use dirfile_storage::{AccessMode, EncodedFile, EncodingKind, EncodingRegistry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An open data file of one RAW field.
pub struct RawChannel {
    fragment_index: usize,
    encoding: EncodingKind,
    mode: AccessMode,
    file: Box<dyn EncodedFile>,
}

impl RawChannel {
    /// Fragment defining the field.
    #[must_use]
    pub fn fragment_index(&self) -> usize {
        self.fragment_index
    }

    /// Encoding of the data file.
    #[must_use]
    pub fn encoding(&self) -> EncodingKind {
        self.encoding
    }

    /// Mode the file was opened in.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// The encoded file handle.
    pub fn file(&mut self) -> &mut dyn EncodedFile {
        self.file.as_mut()
    }
}

/// What a caller wants from a channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelRequest<'a> {
    /// Field code of the RAW entry.
    pub code: &'a str,
    /// Dirfile directory.
    pub root: &'a Path,
    /// Whether the caller is about to write.
    pub writing: bool,
}

/// Open raw channels, keyed by RAW field code.
#[derive(Default)]
pub struct ChannelCache {
    channels: HashMap<String, RawChannel>,
}

impl ChannelCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base path (without encoding suffix) of a RAW field's data file.
    #[must_use]
    pub fn data_base(root: &Path, fragment: &Fragment, code: &str) -> PathBuf {
        root.join(fragment.data_dir()).join(code)
    }

    /// Resolves the fragment's encoding, detecting it from disk if unset.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedEncoding` if no candidate data file exists.
    pub fn resolve_encoding(
        fragment: &mut Fragment,
        registry: &EncodingRegistry,
        base: &Path,
    ) -> CoreResult<EncodingKind> {
        if let Some(kind) = fragment.encoding {
            return Ok(kind);
        }
        let kind = registry
            .detect(base)
            .ok_or_else(|| CoreError::unresolved_encoding(base.display().to_string()))?;
        debug!(fragment = fragment.index, encoding = %kind, "resolved fragment encoding");
        fragment.encoding = Some(kind);
        Ok(kind)
    }

    /// Returns the open channel for `request.code`, opening it on first use
    /// and reopening it read-write on the first write.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedEncoding`, `UnsupportedOperation` if the encoding is
    /// not registered or cannot open files, or an I/O error.
    pub fn acquire(
        &mut self,
        request: ChannelRequest<'_>,
        fragment: &mut Fragment,
        registry: &EncodingRegistry,
    ) -> CoreResult<&mut RawChannel> {
        let stale = self
            .channels
            .get(request.code)
            .is_some_and(|ch| request.writing && !ch.mode.is_writable());
        if stale {
            if let Some(ch) = self.channels.remove(request.code) {
                ch.file.close()?;
            }
        }

        if !self.channels.contains_key(request.code) {
            let base = Self::data_base(request.root, fragment, request.code);
            let kind = Self::resolve_encoding(fragment, registry, &base)?;
            let encoding = registry
                .get(kind)
                .ok_or_else(|| CoreError::unsupported_operation(kind.name(), "open"))?;

            let mode = if request.writing {
                AccessMode::ReadWrite
            } else {
                AccessMode::ReadOnly
            };
            let file = encoding.open(&base, mode, request.writing)?;
            debug!(field = request.code, encoding = %kind, ?mode, "opened raw channel");

            self.channels.insert(
                request.code.to_owned(),
                RawChannel {
                    fragment_index: fragment.index,
                    encoding: kind,
                    mode,
                    file,
                },
            );
        }

        self.channels
            .get_mut(request.code)
            .ok_or_else(|| CoreError::internal(format!("channel for {} vanished", request.code)))
    }

    /// True when a channel for `code` is open.
    #[must_use]
    pub fn is_open(&self, code: &str) -> bool {
        self.channels.contains_key(code)
    }

    /// Number of open channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when no channel is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Flushes one channel, or all of them. Channels stay open.
    ///
    /// # Errors
    ///
    /// Returns the first flush error; remaining channels are still flushed.
    pub fn flush(&mut self, code: Option<&str>) -> CoreResult<()> {
        let mut first_err = None;
        for (name, ch) in &mut self.channels {
            if code.is_some_and(|c| c != name) {
                continue;
            }
            if let Err(e) = ch.file.flush() {
                warn!(field = %name, error = %e, "flush failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Flushes and closes one channel. Closing a channel that is not open
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Returns the error from the final flush.
    pub fn close(&mut self, code: &str) -> CoreResult<()> {
        match self.channels.remove(code) {
            Some(ch) => {
                debug!(field = code, "closing raw channel");
                ch.file.close().map_err(Into::into)
            }
            None => Ok(()),
        }
    }

    /// Flushes and closes every channel.
    ///
    /// # Errors
    ///
    /// Returns the first close error; every channel is released regardless.
    pub fn close_all(&mut self) -> CoreResult<()> {
        let mut first_err = None;
        for (name, ch) in self.channels.drain() {
            if let Err(e) = ch.file.close() {
                warn!(field = %name, error = %e, "close failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Releases every channel without flushing.
    pub fn discard_all(&mut self) {
        let writable = self
            .channels
            .values()
            .filter(|ch| ch.mode.is_writable())
            .count();
        if writable > 0 {
            warn!(channels = writable, "discarding writable channels without flushing");
        } else if !self.channels.is_empty() {
            debug!(channels = self.channels.len(), "discarding raw channels");
        }
        self.channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirfile_storage::MemoryStore;
    use dirfile_types::DataType;

    fn request(code: &str, writing: bool) -> ChannelRequest<'_> {
        ChannelRequest {
            code,
            root: Path::new("d"),
            writing,
        }
    }

    #[test]
    fn auto_detection_fails_without_files() {
        let registry = EncodingRegistry::memory(MemoryStore::new());
        let mut fragment = Fragment::new(0, "format");
        let mut cache = ChannelCache::new();

        let result = cache.acquire(request("data", false), &mut fragment, &registry);
        assert!(matches!(result, Err(CoreError::UnresolvedEncoding { .. })));
        assert!(fragment.encoding.is_none());
    }

    #[test]
    fn detection_is_cached_in_fragment() {
        let store = MemoryStore::new();
        store.insert("d/data", vec![1, 2]);
        let registry = EncodingRegistry::memory(store);
        let mut fragment = Fragment::new(0, "format");
        let mut cache = ChannelCache::new();

        cache
            .acquire(request("data", false), &mut fragment, &registry)
            .unwrap();
        assert_eq!(fragment.encoding, Some(EncodingKind::Memory));
        assert!(cache.is_open("data"));
    }

    #[test]
    fn reopens_read_write_for_writes() {
        let store = MemoryStore::new();
        store.insert("d/data", vec![0; 4]);
        let registry = EncodingRegistry::memory(store);
        let mut fragment = Fragment::new(0, "format").with_encoding(EncodingKind::Memory);
        let mut cache = ChannelCache::new();

        let ch = cache
            .acquire(request("data", false), &mut fragment, &registry)
            .unwrap();
        assert_eq!(ch.mode(), AccessMode::ReadOnly);

        let ch = cache
            .acquire(request("data", true), &mut fragment, &registry)
            .unwrap();
        assert_eq!(ch.mode(), AccessMode::ReadWrite);
        ch.file().seek(0, DataType::UInt8, true).unwrap();
        assert_eq!(ch.file().write(&[7], DataType::UInt8, 1).unwrap(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unregistered_encoding_is_unsupported() {
        let registry = EncodingRegistry::empty();
        let mut fragment = Fragment::new(0, "format").with_encoding(EncodingKind::Text);
        let mut cache = ChannelCache::new();

        let result = cache.acquire(request("data", false), &mut fragment, &registry);
        assert!(matches!(
            result,
            Err(CoreError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn close_and_discard_release() {
        let store = MemoryStore::new();
        store.insert("d/a", vec![0]);
        store.insert("d/b", vec![0]);
        let registry = EncodingRegistry::memory(store);
        let mut fragment = Fragment::new(0, "format");
        let mut cache = ChannelCache::new();

        cache.acquire(request("a", false), &mut fragment, &registry).unwrap();
        cache.acquire(request("b", false), &mut fragment, &registry).unwrap();
        cache.close("a").unwrap();
        assert!(!cache.is_open("a"));
        cache.discard_all();
        assert!(cache.is_empty());
    }
}
