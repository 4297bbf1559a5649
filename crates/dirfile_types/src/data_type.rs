//! The sample type lattice.

use crate::error::{TypeError, TypeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SIGNED: u16 = 0x40;
const IEEE754: u16 = 0x80;
const COMPLEX: u16 = 0x100;

/// A member of the numeric sample type lattice.
///
/// The numeric code of each type packs its element size in the low bits
/// together with class flags: `0x40` signed integer, `0x80` IEEE-754 float,
/// `0x100` complex. For complex types the size bits hold the full element
/// size (both components).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum DataType {
    /// Unsigned 8-bit integer.
    #[serde(rename = "UINT8")]
    UInt8 = 0x01,
    /// Signed 8-bit integer.
    #[serde(rename = "INT8")]
    Int8 = 0x41,
    /// Unsigned 16-bit integer.
    #[serde(rename = "UINT16")]
    UInt16 = 0x02,
    /// Signed 16-bit integer.
    #[serde(rename = "INT16")]
    Int16 = 0x42,
    /// Unsigned 32-bit integer.
    #[serde(rename = "UINT32")]
    UInt32 = 0x04,
    /// Signed 32-bit integer.
    #[serde(rename = "INT32")]
    Int32 = 0x44,
    /// Unsigned 64-bit integer.
    #[serde(rename = "UINT64")]
    UInt64 = 0x08,
    /// Signed 64-bit integer.
    #[serde(rename = "INT64")]
    Int64 = 0x48,
    /// 32-bit IEEE-754 float.
    #[serde(rename = "FLOAT32")]
    Float32 = 0x84,
    /// 64-bit IEEE-754 float.
    #[serde(rename = "FLOAT64")]
    Float64 = 0x88,
    /// Complex number with 32-bit float components.
    #[serde(rename = "COMPLEX64")]
    Complex64 = 0x108,
    /// Complex number with 64-bit float components.
    #[serde(rename = "COMPLEX128")]
    Complex128 = 0x110,
}

impl DataType {
    /// Every member of the lattice, integers first.
    pub const ALL: [DataType; 12] = [
        Self::UInt8,
        Self::Int8,
        Self::UInt16,
        Self::Int16,
        Self::UInt32,
        Self::Int32,
        Self::UInt64,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::Complex64,
        Self::Complex128,
    ];

    /// Converts a numeric type code to a data type.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` for codes outside the lattice.
    pub fn from_code(code: u16) -> TypeResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| TypeError::unsupported_type(format!("0x{code:x}")))
    }

    /// Returns the numeric type code.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Size of one sample in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        (self.code() & 0x1f) as usize
    }

    /// Size of one scalar component in bytes (half the sample size for complex).
    #[must_use]
    pub const fn component_size(self) -> usize {
        if self.is_complex() {
            self.size() / 2
        } else {
            self.size()
        }
    }

    /// True for the signed integer types.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        self.code() & SIGNED != 0
    }

    /// True for real floating-point types.
    #[must_use]
    pub const fn is_float(self) -> bool {
        self.code() & IEEE754 != 0
    }

    /// True for the complex types.
    #[must_use]
    pub const fn is_complex(self) -> bool {
        self.code() & COMPLEX != 0
    }

    /// True for the integer types, signed or not.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        !self.is_float() && !self.is_complex()
    }

    /// The canonical upper-case name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UInt8 => "UINT8",
            Self::Int8 => "INT8",
            Self::UInt16 => "UINT16",
            Self::Int16 => "INT16",
            Self::UInt32 => "UINT32",
            Self::Int32 => "INT32",
            Self::UInt64 => "UINT64",
            Self::Int64 => "INT64",
            Self::Float32 => "FLOAT32",
            Self::Float64 => "FLOAT64",
            Self::Complex64 => "COMPLEX64",
            Self::Complex128 => "COMPLEX128",
        }
    }

    /// Number of bytes needed for `count` samples of this type.
    #[must_use]
    pub const fn bytes_for(self, count: usize) -> usize {
        count * self.size()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = TypeError;

    /// Parses a type name, accepting the legacy single-character aliases.
    fn from_str(s: &str) -> TypeResult<Self> {
        let parsed = match s {
            "UINT8" | "c" => Self::UInt8,
            "INT8" => Self::Int8,
            "UINT16" | "u" => Self::UInt16,
            "INT16" | "s" => Self::Int16,
            "UINT32" | "U" => Self::UInt32,
            "INT32" | "S" | "i" => Self::Int32,
            "UINT64" => Self::UInt64,
            "INT64" => Self::Int64,
            "FLOAT32" | "FLOAT" | "f" => Self::Float32,
            "FLOAT64" | "DOUBLE" | "d" => Self::Float64,
            "COMPLEX64" => Self::Complex64,
            "COMPLEX128" => Self::Complex128,
            other => return Err(TypeError::unsupported_type(other)),
        };
        Ok(parsed)
    }
}
