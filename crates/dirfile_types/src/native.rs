//! Rust types that map onto members of the lattice.

use crate::complex::Complex;
use crate::data_type::DataType;

/// A Rust value type with a lattice counterpart.
///
/// Implementors move between typed slices and the native-endian byte
/// buffers the engine works with internally.
pub trait NativeType: Copy + Default + Send + Sync + 'static {
    /// The lattice member this type represents.
    const DATA_TYPE: DataType;

    /// Writes the value in native byte order into `out`, which holds exactly
    /// `DATA_TYPE.size()` bytes.
    fn write_ne(self, out: &mut [u8]);

    /// Reads a value in native byte order from exactly `DATA_TYPE.size()` bytes.
    fn read_ne(bytes: &[u8]) -> Self;
}

macro_rules! impl_native {
    ($($t:ty => $dt:ident),* $(,)?) => {
        $(
            impl NativeType for $t {
                const DATA_TYPE: DataType = DataType::$dt;

                fn write_ne(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }

                fn read_ne(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_native! {
    u8 => UInt8,
    i8 => Int8,
    u16 => UInt16,
    i16 => Int16,
    u32 => UInt32,
    i32 => Int32,
    u64 => UInt64,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
}

impl NativeType for Complex<f32> {
    const DATA_TYPE: DataType = DataType::Complex64;

    fn write_ne(self, out: &mut [u8]) {
        self.re.write_ne(&mut out[..4]);
        self.im.write_ne(&mut out[4..]);
    }

    fn read_ne(bytes: &[u8]) -> Self {
        Complex::new(f32::read_ne(&bytes[..4]), f32::read_ne(&bytes[4..]))
    }
}

impl NativeType for Complex<f64> {
    const DATA_TYPE: DataType = DataType::Complex128;

    fn write_ne(self, out: &mut [u8]) {
        self.re.write_ne(&mut out[..8]);
        self.im.write_ne(&mut out[8..]);
    }

    fn read_ne(bytes: &[u8]) -> Self {
        Complex::new(f64::read_ne(&bytes[..8]), f64::read_ne(&bytes[8..]))
    }
}

/// Encodes a typed slice into a native-endian byte buffer.
pub fn to_bytes<T: NativeType>(values: &[T]) -> Vec<u8> {
    let size = T::DATA_TYPE.size();
    let mut out = vec![0u8; values.len() * size];
    for (v, chunk) in values.iter().zip(out.chunks_exact_mut(size)) {
        v.write_ne(chunk);
    }
    out
}

/// Decodes a native-endian byte buffer into typed values.
///
/// Trailing bytes that do not form a whole sample are ignored.
pub fn from_bytes<T: NativeType>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(T::DATA_TYPE.size())
        .map(T::read_ne)
        .collect()
}

/// Decodes `bytes` into the front of `out`, returning the number of values written.
pub fn copy_from_bytes<T: NativeType>(bytes: &[u8], out: &mut [T]) -> usize {
    let mut n = 0;
    for (slot, chunk) in out
        .iter_mut()
        .zip(bytes.chunks_exact(T::DATA_TYPE.size()))
    {
        *slot = T::read_ne(chunk);
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_agree_with_lattice() {
        assert_eq!(std::mem::size_of::<u16>(), u16::DATA_TYPE.size());
        assert_eq!(std::mem::size_of::<f64>(), f64::DATA_TYPE.size());
        assert_eq!(16, Complex::<f64>::DATA_TYPE.size());
    }

    #[test]
    fn complex_layout_is_real_then_imaginary() {
        let bytes = to_bytes(&[Complex::new(1.5f32, -2.0f32)]);
        assert_eq!(f32::read_ne(&bytes[..4]), 1.5);
        assert_eq!(f32::read_ne(&bytes[4..]), -2.0);
    }

    #[test]
    fn copy_from_bytes_stops_at_shorter_side() {
        let bytes = to_bytes(&[1i32, 2, 3]);
        let mut out = [0i32; 2];
        assert_eq!(copy_from_bytes(&bytes, &mut out), 2);
        assert_eq!(out, [1, 2]);
    }
}
