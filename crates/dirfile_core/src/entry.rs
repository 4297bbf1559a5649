//! Field definitions.
//!
//! An [`Entry`] names a field and says how its samples come to be: read
//! from a data file (RAW), held inline (CONST, CARRAY, STRING), or computed
//! from other fields. Derived entries refer to their inputs by field code,
//! so the entry table forms a graph that is resolved at evaluation time.

use crate::error::{CoreError, CoreResult};
use dirfile_types::{convert, DataType, NativeType, Scalar};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest number of terms in a LINCOM.
pub const MAX_LINCOM_TERMS: usize = 3;

/// Per-entry flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryFlags {
    /// Omitted from field listings.
    #[serde(default)]
    pub hidden: bool,
}

/// One input of a LINCOM: `m * x + b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LincomTerm {
    /// Input field code.
    pub field: String,
    /// Scale.
    pub m: f64,
    /// Offset.
    pub b: f64,
}

impl LincomTerm {
    /// Creates a term.
    pub fn new(field: impl Into<String>, m: f64, b: f64) -> Self {
        Self {
            field: field.into(),
            m,
            b,
        }
    }
}

/// Comparison applied by a WINDOW entry to its check field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WindowOp {
    /// `check < threshold`
    Lt,
    /// `check <= threshold`
    Le,
    /// `check > threshold`
    Gt,
    /// `check >= threshold`
    Ge,
    /// `check == threshold`
    Eq,
    /// `check != threshold`
    Ne,
    /// `check & threshold != 0`
    Set,
    /// `check & threshold == 0`
    Clr,
}

impl WindowOp {
    /// True when a sample with check value `check` lies inside the window.
    #[must_use]
    pub fn admits(self, check: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => check < threshold,
            Self::Le => check <= threshold,
            Self::Gt => check > threshold,
            Self::Ge => check >= threshold,
            Self::Eq => check == threshold,
            Self::Ne => check != threshold,
            Self::Set => (check as i64 as u64) & (threshold as i64 as u64) != 0,
            Self::Clr => (check as i64 as u64) & (threshold as i64 as u64) == 0,
        }
    }
}

/// An inline typed payload: one value for CONST, several for CARRAY.
///
/// Values are kept in native byte order in their declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LiteralRepr", into = "LiteralRepr")]
pub struct Literal {
    data_type: DataType,
    bytes: Vec<u8>,
}

impl Literal {
    /// A payload of `values`, stored as their own type.
    pub fn from_values<T: NativeType>(values: &[T]) -> Self {
        Self {
            data_type: T::DATA_TYPE,
            bytes: dirfile_types::to_bytes(values),
        }
    }

    /// A zero-filled payload of `len` values.
    #[must_use]
    pub fn zeroed(data_type: DataType, len: usize) -> Self {
        Self {
            data_type,
            bytes: vec![0u8; data_type.bytes_for(len)],
        }
    }

    /// Declared storage type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.data_type.size()
    }

    /// True when there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw native-endian bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies `count` values starting at `start` into `out` as type `ty`.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if the slice runs past the end of the payload.
    pub fn read_slice(
        &self,
        start: usize,
        count: usize,
        ty: DataType,
        out: &mut [u8],
    ) -> CoreResult<()> {
        let end = start
            .checked_add(count)
            .filter(|&end| end <= self.len())
            .ok_or_else(|| {
                CoreError::range(format!(
                    "slice {start}+{count} beyond literal of length {}",
                    self.len()
                ))
            })?;
        let size = self.data_type.size();
        convert(
            &self.bytes[start * size..end * size],
            self.data_type,
            out,
            ty,
            count,
        )?;
        Ok(())
    }

    /// Overwrites `count` values starting at `start` with `data` of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if the slice runs past the end of the payload.
    pub fn write_slice(
        &mut self,
        start: usize,
        count: usize,
        ty: DataType,
        data: &[u8],
    ) -> CoreResult<()> {
        let end = start
            .checked_add(count)
            .filter(|&end| end <= self.len())
            .ok_or_else(|| {
                CoreError::range(format!(
                    "slice {start}+{count} beyond literal of length {}",
                    self.len()
                ))
            })?;
        let size = self.data_type.size();
        convert(
            data,
            ty,
            &mut self.bytes[start * size..end * size],
            self.data_type,
            count,
        )?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LiteralValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex([f64; 2]),
}

#[derive(Serialize, Deserialize)]
struct LiteralRepr {
    #[serde(rename = "type")]
    data_type: DataType,
    values: Vec<LiteralValue>,
}

impl From<LiteralRepr> for Literal {
    fn from(repr: LiteralRepr) -> Self {
        let ty = repr.data_type;
        let mut bytes = vec![0u8; ty.bytes_for(repr.values.len())];
        for (value, chunk) in repr.values.iter().zip(bytes.chunks_exact_mut(ty.size())) {
            let scalar = match *value {
                LiteralValue::Int(v) => Scalar::Int(i128::from(v)),
                LiteralValue::UInt(v) => Scalar::Int(i128::from(v)),
                LiteralValue::Float(v) => Scalar::Float(v),
                LiteralValue::Complex([re, im]) => Scalar::Complex(re, im),
            };
            scalar.write(ty, chunk);
        }
        Self {
            data_type: ty,
            bytes,
        }
    }
}

impl From<Literal> for LiteralRepr {
    fn from(literal: Literal) -> Self {
        let ty = literal.data_type;
        let values = literal
            .bytes
            .chunks_exact(ty.size())
            .map(|chunk| match Scalar::read(chunk, ty) {
                Scalar::Int(v) if ty.is_signed() => LiteralValue::Int(v as i64),
                Scalar::Int(v) => LiteralValue::UInt(v as u64),
                Scalar::Float(v) => LiteralValue::Float(v),
                Scalar::Complex(re, im) => LiteralValue::Complex([re, im]),
            })
            .collect();
        Self {
            data_type: ty,
            values,
        }
    }
}

/// The kind-specific part of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Samples stored in a data file.
    Raw {
        /// On-disk sample type.
        data_type: DataType,
        /// Samples per frame.
        spf: u32,
    },
    /// Sum of scaled and offset inputs.
    Lincom {
        /// One to three terms.
        terms: Vec<LincomTerm>,
    },
    /// Input mapped through a lookup table.
    Linterp {
        /// Input field code.
        input: String,
        /// Table file, relative to the dirfile directory.
        table: PathBuf,
    },
    /// Unsigned bit span of the input.
    Bit {
        /// Input field code.
        input: String,
        /// First bit, counted from the least significant.
        bitnum: u32,
        /// Width of the span.
        numbits: u32,
    },
    /// Sign-extended bit span of the input.
    #[serde(rename = "SBIT")]
    SignedBit {
        /// Input field code.
        input: String,
        /// First bit, counted from the least significant.
        bitnum: u32,
        /// Width of the span.
        numbits: u32,
    },
    /// Input shifted by a fixed number of samples.
    Phase {
        /// Input field code.
        input: String,
        /// Shift in samples; positive looks ahead.
        shift: i64,
    },
    /// Polynomial of the input.
    Polynom {
        /// Input field code.
        input: String,
        /// Coefficients, constant term first.
        a: Vec<f64>,
    },
    /// A single inline value.
    Const {
        /// The value.
        value: Literal,
    },
    /// A fixed-length inline array.
    #[serde(rename = "CARRAY")]
    CArray {
        /// The values.
        values: Literal,
    },
    /// An inline string.
    String {
        /// The string.
        value: String,
    },
    /// Product of two inputs.
    Multiply {
        /// First input.
        a: String,
        /// Second input.
        b: String,
    },
    /// Quotient of two inputs.
    Divide {
        /// Dividend field.
        a: String,
        /// Divisor field.
        b: String,
    },
    /// `dividend / input`.
    Recip {
        /// Input field code.
        input: String,
        /// Constant dividend.
        dividend: f64,
    },
    /// Input where a check field passes a test, NaN elsewhere.
    Window {
        /// Input field code.
        input: String,
        /// Check field code.
        check: String,
        /// Test applied to the check field.
        op: WindowOp,
        /// Threshold for the test.
        threshold: f64,
    },
    /// Input sampled where a count field equals `count_val`.
    Mplex {
        /// Input field code.
        input: String,
        /// Count field code.
        count: String,
        /// Count value selecting this field.
        count_val: i64,
        /// Expected samples between selections; 0 if unknown.
        #[serde(default)]
        period: usize,
    },
    /// The implicit sample counter.
    Index,
}

/// The tag of an [`EntryKind`], without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum EntryType {
    Raw,
    Lincom,
    Linterp,
    Bit,
    SignedBit,
    Phase,
    Polynom,
    Const,
    CArray,
    String,
    Multiply,
    Divide,
    Recip,
    Window,
    Mplex,
    Index,
}

/// A named field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Field code, unique within the session.
    pub code: String,
    /// Index of the fragment defining this entry.
    #[serde(default)]
    pub fragment_index: usize,
    /// Flags.
    #[serde(default)]
    pub flags: EntryFlags,
    /// Kind and parameters.
    #[serde(flatten)]
    pub kind: EntryKind,
}

impl Entry {
    /// An entry in fragment 0.
    pub fn new(code: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            code: code.into(),
            fragment_index: 0,
            flags: EntryFlags::default(),
            kind,
        }
    }

    /// A RAW entry.
    pub fn raw(code: impl Into<String>, data_type: DataType, spf: u32) -> Self {
        Self::new(code, EntryKind::Raw { data_type, spf })
    }

    /// A LINCOM entry.
    pub fn lincom(code: impl Into<String>, terms: Vec<LincomTerm>) -> Self {
        Self::new(code, EntryKind::Lincom { terms })
    }

    /// A LINTERP entry.
    pub fn linterp(
        code: impl Into<String>,
        input: impl Into<String>,
        table: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            code,
            EntryKind::Linterp {
                input: input.into(),
                table: table.into(),
            },
        )
    }

    /// A BIT entry.
    pub fn bit(code: impl Into<String>, input: impl Into<String>, bitnum: u32, numbits: u32) -> Self {
        Self::new(
            code,
            EntryKind::Bit {
                input: input.into(),
                bitnum,
                numbits,
            },
        )
    }

    /// An SBIT entry.
    pub fn signed_bit(
        code: impl Into<String>,
        input: impl Into<String>,
        bitnum: u32,
        numbits: u32,
    ) -> Self {
        Self::new(
            code,
            EntryKind::SignedBit {
                input: input.into(),
                bitnum,
                numbits,
            },
        )
    }

    /// A PHASE entry.
    pub fn phase(code: impl Into<String>, input: impl Into<String>, shift: i64) -> Self {
        Self::new(
            code,
            EntryKind::Phase {
                input: input.into(),
                shift,
            },
        )
    }

    /// A POLYNOM entry.
    pub fn polynom(code: impl Into<String>, input: impl Into<String>, a: Vec<f64>) -> Self {
        Self::new(
            code,
            EntryKind::Polynom {
                input: input.into(),
                a,
            },
        )
    }

    /// A CONST entry.
    pub fn constant(code: impl Into<String>, value: Literal) -> Self {
        Self::new(code, EntryKind::Const { value })
    }

    /// A CARRAY entry.
    pub fn carray(code: impl Into<String>, values: Literal) -> Self {
        Self::new(code, EntryKind::CArray { values })
    }

    /// A STRING entry.
    pub fn string(code: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            code,
            EntryKind::String {
                value: value.into(),
            },
        )
    }

    /// A MULTIPLY entry.
    pub fn multiply(code: impl Into<String>, a: impl Into<String>, b: impl Into<String>) -> Self {
        Self::new(
            code,
            EntryKind::Multiply {
                a: a.into(),
                b: b.into(),
            },
        )
    }

    /// A DIVIDE entry.
    pub fn divide(code: impl Into<String>, a: impl Into<String>, b: impl Into<String>) -> Self {
        Self::new(
            code,
            EntryKind::Divide {
                a: a.into(),
                b: b.into(),
            },
        )
    }

    /// A RECIP entry.
    pub fn recip(code: impl Into<String>, input: impl Into<String>, dividend: f64) -> Self {
        Self::new(
            code,
            EntryKind::Recip {
                input: input.into(),
                dividend,
            },
        )
    }

    /// A WINDOW entry.
    pub fn window(
        code: impl Into<String>,
        input: impl Into<String>,
        check: impl Into<String>,
        op: WindowOp,
        threshold: f64,
    ) -> Self {
        Self::new(
            code,
            EntryKind::Window {
                input: input.into(),
                check: check.into(),
                op,
                threshold,
            },
        )
    }

    /// An MPLEX entry.
    pub fn mplex(
        code: impl Into<String>,
        input: impl Into<String>,
        count: impl Into<String>,
        count_val: i64,
        period: usize,
    ) -> Self {
        Self::new(
            code,
            EntryKind::Mplex {
                input: input.into(),
                count: count.into(),
                count_val,
                period,
            },
        )
    }

    /// Moves the entry to another fragment.
    #[must_use]
    pub fn in_fragment(mut self, index: usize) -> Self {
        self.fragment_index = index;
        self
    }

    /// Marks the entry hidden.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.flags.hidden = true;
        self
    }

    /// The tag of this entry's kind.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        match &self.kind {
            EntryKind::Raw { .. } => EntryType::Raw,
            EntryKind::Lincom { .. } => EntryType::Lincom,
            EntryKind::Linterp { .. } => EntryType::Linterp,
            EntryKind::Bit { .. } => EntryType::Bit,
            EntryKind::SignedBit { .. } => EntryType::SignedBit,
            EntryKind::Phase { .. } => EntryType::Phase,
            EntryKind::Polynom { .. } => EntryType::Polynom,
            EntryKind::Const { .. } => EntryType::Const,
            EntryKind::CArray { .. } => EntryType::CArray,
            EntryKind::String { .. } => EntryType::String,
            EntryKind::Multiply { .. } => EntryType::Multiply,
            EntryKind::Divide { .. } => EntryType::Divide,
            EntryKind::Recip { .. } => EntryType::Recip,
            EntryKind::Window { .. } => EntryType::Window,
            EntryKind::Mplex { .. } => EntryType::Mplex,
            EntryKind::Index => EntryType::Index,
        }
    }

    /// Field codes this entry reads from, first input first.
    #[must_use]
    pub fn in_fields(&self) -> Vec<&str> {
        match &self.kind {
            EntryKind::Lincom { terms } => terms.iter().map(|t| t.field.as_str()).collect(),
            EntryKind::Linterp { input, .. }
            | EntryKind::Bit { input, .. }
            | EntryKind::SignedBit { input, .. }
            | EntryKind::Phase { input, .. }
            | EntryKind::Polynom { input, .. }
            | EntryKind::Recip { input, .. } => vec![input.as_str()],
            EntryKind::Multiply { a, b } | EntryKind::Divide { a, b } => {
                vec![a.as_str(), b.as_str()]
            }
            EntryKind::Window { input, check, .. } => vec![input.as_str(), check.as_str()],
            EntryKind::Mplex { input, count, .. } => vec![input.as_str(), count.as_str()],
            EntryKind::Raw { .. }
            | EntryKind::Const { .. }
            | EntryKind::CArray { .. }
            | EntryKind::String { .. }
            | EntryKind::Index => Vec::new(),
        }
    }

    /// True for CONST, CARRAY and STRING.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            EntryKind::Const { .. } | EntryKind::CArray { .. } | EntryKind::String { .. }
        )
    }

    /// Checks the entry's parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntry` describing the first problem found.
    pub fn validate(&self, n_fragments: usize) -> CoreResult<()> {
        let bad = |message: String| Err(CoreError::invalid_entry(&self.code, message));

        if self.code.is_empty() {
            return bad("empty field code".into());
        }
        if self.fragment_index >= n_fragments {
            return bad(format!("no fragment {}", self.fragment_index));
        }

        match &self.kind {
            EntryKind::Raw { spf, .. } if *spf == 0 => bad("samples per frame must be positive".into()),
            EntryKind::Lincom { terms } if terms.is_empty() || terms.len() > MAX_LINCOM_TERMS => {
                bad(format!("LINCOM needs 1 to {MAX_LINCOM_TERMS} terms, got {}", terms.len()))
            }
            EntryKind::Bit {
                bitnum, numbits, ..
            }
            | EntryKind::SignedBit {
                bitnum, numbits, ..
            } if *numbits == 0 || bitnum.checked_add(*numbits).map_or(true, |end| end > 64) => {
                bad(format!("bit span {bitnum}+{numbits} does not fit in 64 bits"))
            }
            EntryKind::Polynom { a, .. } if a.is_empty() => bad("POLYNOM needs a coefficient".into()),
            EntryKind::Const { value } if value.len() != 1 => bad("CONST holds exactly one value".into()),
            EntryKind::CArray { values } if values.is_empty() => bad("CARRAY is empty".into()),
            _ => Ok(()),
        }
    }
}
