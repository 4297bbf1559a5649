//! # Dirfile Types
//!
//! The numeric sample type lattice for dirfile databases.
//!
//! Every field in a dirfile stores or produces samples of one of twelve
//! types: signed and unsigned integers of 8 to 64 bits, 32- and 64-bit
//! floats, and complex numbers built from either float width. This crate
//! defines that lattice and converts buffers between any two members.
//!
//! ## Conversion Rules
//!
//! - Integer narrowing wraps (no saturation)
//! - Float to integer truncates toward zero; NaN becomes zero
//! - Integer to float is exact where representable
//! - Complex to real keeps the real part; real to complex zero-fills
//! - NaN and infinities survive float-to-float conversion
//!
//! ## Usage
//!
//! ```
//! use dirfile_types::{convert_to_vec, from_bytes, to_bytes, DataType};
//!
//! let src = to_bytes(&[1.9f64, -2.5]);
//! let out = convert_to_vec(&src, DataType::Float64, DataType::Int16, 2).unwrap();
//! assert_eq!(from_bytes::<i16>(&out), vec![1, -2]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod complex;
mod convert;
mod data_type;
mod endian;
mod error;
mod native;
mod scalar;

pub use complex::Complex;
pub use convert::{convert, convert_to_vec};
pub use data_type::DataType;
pub use endian::{host_is_big_endian, swap_in_place};
pub use error::{TypeError, TypeResult};
pub use native::{copy_from_bytes, from_bytes, to_bytes, NativeType};
pub use scalar::Scalar;
