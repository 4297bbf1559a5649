//! # Dirfile Core
//!
//! Field evaluation engine for dirfile time-series databases.
//!
//! A dirfile is a directory of per-field data files described by format
//! metadata. Some fields are stored (RAW); most are computed on demand from
//! other fields by a small algebra of linear combinations, lookup tables,
//! bit extraction, phase shifts, polynomials and arithmetic. This crate
//! evaluates that algebra for reading and, where a transform can be
//! inverted, for writing.
//!
//! This crate provides:
//! - The entry model ([`Entry`], [`EntryKind`]) and fragment list
//! - The entry table with alias resolution
//! - The recursive read/write dispatcher, bounded by a recursion ceiling
//! - Raw channels: lazily opened, cached data files
//! - The [`Dirfile`] session with its frame-addressed API
//!
//! Parsing format files is not part of this crate; sessions are opened from
//! a ready-made [`Metadata`].
//!
//! ## Example
//!
//! ```rust
//! use dirfile_core::{Config, Dirfile, Entry, LincomTerm, Metadata};
//! use dirfile_storage::MemoryStore;
//! use dirfile_types::DataType;
//!
//! let metadata = Metadata::single_fragment()
//!     .with_entry(Entry::raw("counts", DataType::UInt16, 4))
//!     .with_entry(Entry::lincom("volts", vec![LincomTerm::new("counts", 0.5, 1.0)]));
//! let mut dirfile = Dirfile::open_in_memory(metadata, Config::new().read_write(), MemoryStore::new())?;
//!
//! dirfile.put_data("counts", 0, 0, 1, 0, &[0u16, 2, 4, 6])?;
//!
//! let mut volts = [0.0f64; 4];
//! let n = dirfile.get_data("volts", 0, 0, 1, 0, &mut volts)?;
//! assert_eq!(n, 4);
//! assert_eq!(volts, [1.0, 2.0, 3.0, 4.0]);
//! # Ok::<(), dirfile_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod config;
mod dirfile;
mod dispatch;
mod entry;
mod error;
mod fragment;
mod linterp;
mod table;
mod working;

pub use channel::{ChannelCache, ChannelRequest, RawChannel};
pub use config::{Config, DEFAULT_MAX_RECURSION};
pub use dirfile::Dirfile;
pub use entry::{
    Entry, EntryFlags, EntryKind, EntryType, LincomTerm, Literal, WindowOp, MAX_LINCOM_TERMS,
};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use fragment::{Endianness, Fragment, Protection};
pub use linterp::LinterpTable;
pub use table::{EntryTable, Metadata, INDEX_FIELD};

// Re-export the lower layers for convenience.
pub use dirfile_storage::{AccessMode, EncodingKind, EncodingRegistry};
pub use dirfile_types::{Complex, DataType, NativeType};
