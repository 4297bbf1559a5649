//! Lookup of encodings by kind, and auto-detection.

use crate::encoding::{Encoding, EncodingKind};
use crate::memory::{MemoryEncoding, MemoryStore};
use crate::text::TextEncoding;
use crate::unencoded::Unencoded;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// The set of encodings a session can use.
///
/// Encodings are probed in registration order during auto-detection.
pub struct EncodingRegistry {
    encodings: Vec<Box<dyn Encoding>>,
}

impl EncodingRegistry {
    /// A registry with no encodings at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            encodings: Vec::new(),
        }
    }

    /// A registry holding only a [`MemoryEncoding`] over `store`.
    #[must_use]
    pub fn memory(store: MemoryStore) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(MemoryEncoding::new(store)));
        registry
    }

    /// Adds an encoding, replacing any already registered for the same kind.
    pub fn register(&mut self, encoding: Box<dyn Encoding>) {
        let kind = encoding.kind();
        match self.encodings.iter_mut().find(|e| e.kind() == kind) {
            Some(slot) => *slot = encoding,
            None => self.encodings.push(encoding),
        }
    }

    /// Returns the encoding implementing `kind`, if registered.
    #[must_use]
    pub fn get(&self, kind: EncodingKind) -> Option<&dyn Encoding> {
        self.encodings
            .iter()
            .find(|e| e.kind() == kind)
            .map(|e| &**e)
    }

    /// Determines which encoding holds the data file for `base` by probing
    /// each registered encoding's candidate file name.
    ///
    /// Returns `None` when no candidate exists.
    #[must_use]
    pub fn detect(&self, base: &Path) -> Option<EncodingKind> {
        let found = self
            .encodings
            .iter()
            .find(|e| e.exists(base))
            .map(|e| e.kind());
        debug!(path = %base.display(), encoding = ?found, "probed data file encoding");
        found
    }

    /// Kinds registered, in probe order.
    pub fn kinds(&self) -> impl Iterator<Item = EncodingKind> + '_ {
        self.encodings.iter().map(|e| e.kind())
    }
}

impl Default for EncodingRegistry {
    /// Unencoded and text encodings.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Unencoded));
        registry.register(Box::new(TextEncoding));
        registry
    }
}

impl fmt::Debug for EncodingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_registers_unencoded_and_text() {
        let registry = EncodingRegistry::default();
        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(kinds, vec![EncodingKind::Unencoded, EncodingKind::Text]);
        assert!(registry.get(EncodingKind::Memory).is_none());
    }

    #[test]
    fn detect_finds_text_by_suffix() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("data.txt"), "1\n").unwrap();

        let registry = EncodingRegistry::default();
        assert_eq!(
            registry.detect(&dir.path().join("data")),
            Some(EncodingKind::Text)
        );
    }

    #[test]
    fn detect_prefers_registration_order() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("data"), [0u8]).unwrap();
        std::fs::write(dir.path().join("data.txt"), "1\n").unwrap();

        let registry = EncodingRegistry::default();
        assert_eq!(
            registry.detect(&dir.path().join("data")),
            Some(EncodingKind::Unencoded)
        );
    }

    #[test]
    fn detect_none_when_nothing_exists() {
        let dir = tempdir().unwrap();
        let registry = EncodingRegistry::default();
        assert_eq!(registry.detect(&dir.path().join("data")), None);
    }

    #[test]
    fn register_replaces_same_kind() {
        let mut registry = EncodingRegistry::default();
        registry.register(Box::new(TextEncoding));
        assert_eq!(registry.kinds().count(), 2);
    }
}
