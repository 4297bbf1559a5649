//! Format fragments.

use dirfile_storage::EncodingKind;
use dirfile_types::host_is_big_endian;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Byte order of a fragment's raw data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endianness {
    /// Whatever the host uses.
    #[default]
    Native,
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

impl Endianness {
    /// True when data in this order must be byte-swapped on this host.
    #[must_use]
    pub const fn needs_swap(self) -> bool {
        match self {
            Self::Native => false,
            Self::Little => host_is_big_endian(),
            Self::Big => !host_is_big_endian(),
        }
    }
}

/// What a fragment's protection forbids changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Protection {
    /// Nothing is protected.
    #[default]
    None,
    /// Metadata (including CONST, CARRAY and STRING payloads) is protected.
    Format,
    /// Raw data files are protected.
    Data,
    /// Both metadata and data are protected.
    All,
}

impl Protection {
    /// True when literal payloads may not change.
    #[must_use]
    pub const fn protects_format(self) -> bool {
        matches!(self, Self::Format | Self::All)
    }

    /// True when raw data may not be written.
    #[must_use]
    pub const fn protects_data(self) -> bool {
        matches!(self, Self::Data | Self::All)
    }
}

/// One format file and the settings it applies to the fields it defines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Position in the session's fragment list.
    pub index: usize,
    /// Path of the format file, relative to the dirfile directory.
    pub file_path: PathBuf,
    /// Data file encoding; `None` means detect from the files on disk.
    #[serde(default)]
    pub encoding: Option<EncodingKind>,
    /// Byte order of raw data files.
    #[serde(default)]
    pub endianness: Endianness,
    /// Protection level.
    #[serde(default)]
    pub protection: Protection,
    /// Set when a literal payload defined here changed since the last
    /// metadata write.
    #[serde(default, skip_serializing)]
    pub modified: bool,
}

impl Fragment {
    /// A fragment for the format file at `file_path` with auto-detected
    /// encoding, native byte order and no protection.
    #[must_use]
    pub fn new(index: usize, file_path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            file_path: file_path.into(),
            encoding: None,
            endianness: Endianness::Native,
            protection: Protection::None,
            modified: false,
        }
    }

    /// Sets the encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: EncodingKind) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Sets the byte order.
    #[must_use]
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Sets the protection level.
    #[must_use]
    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    /// Directory holding this fragment's data files, relative to the dirfile.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.file_path.parent().unwrap_or_else(|| Path::new(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_order_needs_swap() {
        let foreign = if host_is_big_endian() {
            Endianness::Little
        } else {
            Endianness::Big
        };
        assert!(foreign.needs_swap());
        assert!(!Endianness::Native.needs_swap());
    }

    #[test]
    fn protection_levels() {
        assert!(Protection::All.protects_data());
        assert!(Protection::All.protects_format());
        assert!(Protection::Data.protects_data());
        assert!(!Protection::Data.protects_format());
        assert!(!Protection::None.protects_data());
    }

    #[test]
    fn data_dir_follows_format_file() {
        assert_eq!(Fragment::new(0, "format").data_dir(), Path::new(""));
        assert_eq!(Fragment::new(1, "sub/format").data_dir(), Path::new("sub"));
    }
}
