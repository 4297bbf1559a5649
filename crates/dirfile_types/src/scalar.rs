//! A single sample lifted out of its storage type.

use crate::complex::Complex;
use crate::data_type::DataType;
use crate::native::NativeType;

/// One sample, widened so that every lattice member fits without loss.
///
/// Integers widen to `i128` (covering both `i64` and `u64`), reals to `f64`
/// and complex values to a pair of `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Any integer sample.
    Int(i128),
    /// Any real floating-point sample.
    Float(f64),
    /// Any complex sample.
    Complex(f64, f64),
}

impl Scalar {
    /// Reads one native-endian sample of type `ty` from `bytes`.
    #[must_use]
    pub fn read(bytes: &[u8], ty: DataType) -> Self {
        match ty {
            DataType::UInt8 => Self::Int(i128::from(u8::read_ne(bytes))),
            DataType::Int8 => Self::Int(i128::from(i8::read_ne(bytes))),
            DataType::UInt16 => Self::Int(i128::from(u16::read_ne(bytes))),
            DataType::Int16 => Self::Int(i128::from(i16::read_ne(bytes))),
            DataType::UInt32 => Self::Int(i128::from(u32::read_ne(bytes))),
            DataType::Int32 => Self::Int(i128::from(i32::read_ne(bytes))),
            DataType::UInt64 => Self::Int(i128::from(u64::read_ne(bytes))),
            DataType::Int64 => Self::Int(i128::from(i64::read_ne(bytes))),
            DataType::Float32 => Self::Float(f64::from(f32::read_ne(bytes))),
            DataType::Float64 => Self::Float(f64::read_ne(bytes)),
            DataType::Complex64 => {
                let c = Complex::<f32>::read_ne(bytes);
                Self::Complex(f64::from(c.re), f64::from(c.im))
            }
            DataType::Complex128 => {
                let c = Complex::<f64>::read_ne(bytes);
                Self::Complex(c.re, c.im)
            }
        }
    }

    /// Writes this sample as type `ty` into `out`.
    ///
    /// Integer narrowing wraps (keeps the low-order bits). Reals convert to
    /// integers by truncation toward zero; NaN becomes zero and values
    /// beyond the `i128` range clamp before wrapping. Complex values keep
    /// only their real part when the target is real.
    pub fn write(self, ty: DataType, out: &mut [u8]) {
        match ty {
            DataType::UInt8 => (self.as_i128() as u8).write_ne(out),
            DataType::Int8 => (self.as_i128() as i8).write_ne(out),
            DataType::UInt16 => (self.as_i128() as u16).write_ne(out),
            DataType::Int16 => (self.as_i128() as i16).write_ne(out),
            DataType::UInt32 => (self.as_i128() as u32).write_ne(out),
            DataType::Int32 => (self.as_i128() as i32).write_ne(out),
            DataType::UInt64 => (self.as_i128() as u64).write_ne(out),
            DataType::Int64 => (self.as_i128() as i64).write_ne(out),
            DataType::Float32 => (self.as_f64() as f32).write_ne(out),
            DataType::Float64 => self.as_f64().write_ne(out),
            DataType::Complex64 => {
                let (re, im) = self.as_complex();
                Complex::new(re as f32, im as f32).write_ne(out);
            }
            DataType::Complex128 => {
                let (re, im) = self.as_complex();
                Complex::new(re, im).write_ne(out);
            }
        }
    }

    /// The sample as an integer.
    #[must_use]
    pub fn as_i128(self) -> i128 {
        match self {
            Self::Int(v) => v,
            Self::Float(f) | Self::Complex(f, _) => f as i128,
        }
    }

    /// The sample as a real number.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(f) | Self::Complex(f, _) => f,
        }
    }

    /// The sample as a `(re, im)` pair; real samples get a zero imaginary part.
    #[must_use]
    pub fn as_complex(self) -> (f64, f64) {
        match self {
            Self::Int(v) => (v as f64, 0.0),
            Self::Float(f) => (f, 0.0),
            Self::Complex(re, im) => (re, im),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: Scalar, ty: DataType) -> Scalar {
        let mut buf = vec![0u8; ty.size()];
        value.write(ty, &mut buf);
        Scalar::read(&buf, ty)
    }

    #[test]
    fn narrowing_wraps() {
        assert_eq!(roundtrip(Scalar::Int(0x1ff), DataType::UInt8), Scalar::Int(0xff));
        assert_eq!(roundtrip(Scalar::Int(0x180), DataType::Int8), Scalar::Int(-128));
        assert_eq!(roundtrip(Scalar::Int(-1), DataType::UInt16), Scalar::Int(0xffff));
    }

    #[test]
    fn float_to_int_truncates_toward_zero() {
        assert_eq!(roundtrip(Scalar::Float(2.9), DataType::Int32), Scalar::Int(2));
        assert_eq!(roundtrip(Scalar::Float(-2.9), DataType::Int32), Scalar::Int(-2));
    }

    #[test]
    fn nan_to_int_does_not_fault() {
        assert_eq!(roundtrip(Scalar::Float(f64::NAN), DataType::Int64), Scalar::Int(0));
        let _ = roundtrip(Scalar::Float(f64::INFINITY), DataType::UInt8);
    }

    #[test]
    fn complex_to_real_keeps_real_part() {
        assert_eq!(
            roundtrip(Scalar::Complex(8.0, 3.0), DataType::UInt64),
            Scalar::Int(8)
        );
        assert_eq!(
            roundtrip(Scalar::Complex(1.5, 3.0), DataType::Float64),
            Scalar::Float(1.5)
        );
    }

    #[test]
    fn real_to_complex_zero_fills() {
        assert_eq!(
            roundtrip(Scalar::Int(4), DataType::Complex64),
            Scalar::Complex(4.0, 0.0)
        );
    }

    #[test]
    fn uint64_max_survives() {
        assert_eq!(
            roundtrip(Scalar::Int(i128::from(u64::MAX)), DataType::UInt64),
            Scalar::Int(i128::from(u64::MAX))
        );
    }
}
