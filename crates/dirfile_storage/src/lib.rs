//! # Dirfile Storage
//!
//! Data-file encodings for dirfile databases.
//!
//! Every RAW field of a dirfile is backed by one data file. How the samples
//! are laid out in that file is the business of an encoding. This crate
//! defines the encoding contract and the registry the engine uses to pick
//! an encoding per fragment.
//!
//! ## Design Principles
//!
//! - An [`Encoding`] is a stateless factory; an [`EncodedFile`] is an open
//!   handle with a position
//! - Positions and counts are in samples, never bytes
//! - A primitive an encoding cannot provide reports `Unsupported` instead
//!   of being absent
//! - Encodings know nothing about fields, entries or fragments
//!
//! ## Available Encodings
//!
//! - [`Unencoded`] - raw binary samples
//! - [`TextEncoding`] - one ASCII sample per line
//! - [`MemoryEncoding`] - in-process store for tests
//!
//! ## Example
//!
//! ```rust
//! use dirfile_storage::{AccessMode, Encoding, MemoryEncoding};
//! use dirfile_types::DataType;
//! use std::path::Path;
//!
//! let enc = MemoryEncoding::default();
//! let mut file = enc.open(Path::new("d/data"), AccessMode::ReadWrite, true).unwrap();
//! file.write(&[1, 2, 3], DataType::UInt8, 3).unwrap();
//! file.seek(0, DataType::UInt8, false).unwrap();
//! let mut buf = [0u8; 3];
//! assert_eq!(file.read(&mut buf, DataType::UInt8, 3).unwrap(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod encoding;
mod error;
mod memory;
mod registry;
mod text;
mod unencoded;

pub use encoding::{AccessMode, EncodedFile, Encoding, EncodingKind};
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryEncoding, MemoryFile, MemoryStore};
pub use registry::EncodingRegistry;
pub use text::{TextEncoding, TextFile, TEXT_SUFFIX};
pub use unencoded::{Unencoded, UnencodedFile};
