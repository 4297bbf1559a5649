//! # Dirfile Testkit
//!
//! Test utilities for the dirfile engine.
//!
//! This crate provides:
//! - Fixtures that lay out temporary dirfiles, on disk or in memory
//! - Property-based test generators using proptest
//! - Cross-crate integration test helpers
//! - JSON read vectors shared with other implementations
//!
//! ## Usage
//!
//! ```rust
//! use dirfile_core::{Entry, LincomTerm};
//! use dirfile_testkit::prelude::*;
//!
//! let mut fixture = DirfileBuilder::new()
//!     .raw("counts", &[1u16, 2, 3, 4], 2)
//!     .entry(Entry::lincom("doubled", vec![LincomTerm::new("counts", 2.0, 0.0)]))
//!     .build();
//!
//! assert_eq!(fixture.read_all::<f64>("doubled").unwrap(), vec![2.0, 4.0, 6.0, 8.0]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use vectors::*;
