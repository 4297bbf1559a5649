//! Element-wise conversion between lattice members.

use crate::data_type::DataType;
use crate::error::{TypeError, TypeResult};
use crate::scalar::Scalar;

/// Converts `count` samples from `src` (of `src_type`) into `dst` (of `dst_type`).
///
/// Both buffers are in native byte order. Conversion follows [`Scalar`]:
/// integer narrowing wraps, reals truncate toward zero when converted to
/// integers, complex values lose their imaginary part when converted to
/// reals and reals gain a zero imaginary part when converted to complex.
/// NaN and infinities pass through float-to-float conversions unchanged.
///
/// # Errors
///
/// Returns `BufferTooSmall` if either buffer cannot hold `count` samples.
pub fn convert(
    src: &[u8],
    src_type: DataType,
    dst: &mut [u8],
    dst_type: DataType,
    count: usize,
) -> TypeResult<()> {
    let src_len = src_type.bytes_for(count);
    let dst_len = dst_type.bytes_for(count);
    if src.len() < src_len {
        return Err(TypeError::buffer_too_small(src_len, src.len()));
    }
    if dst.len() < dst_len {
        return Err(TypeError::buffer_too_small(dst_len, dst.len()));
    }

    if src_type == dst_type {
        dst[..dst_len].copy_from_slice(&src[..src_len]);
        return Ok(());
    }

    for (s, d) in src[..src_len]
        .chunks_exact(src_type.size())
        .zip(dst[..dst_len].chunks_exact_mut(dst_type.size()))
    {
        Scalar::read(s, src_type).write(dst_type, d);
    }
    Ok(())
}

/// Converts `count` samples into a freshly allocated buffer of `dst_type`.
///
/// # Errors
///
/// Returns `BufferTooSmall` if `src` holds fewer than `count` samples.
pub fn convert_to_vec(
    src: &[u8],
    src_type: DataType,
    dst_type: DataType,
    count: usize,
) -> TypeResult<Vec<u8>> {
    let mut out = vec![0u8; dst_type.bytes_for(count)];
    convert(src, src_type, &mut out, dst_type, count)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complex::Complex;
    use crate::native::{from_bytes, to_bytes};
    use proptest::prelude::*;

    #[test]
    fn identity_is_a_copy() {
        let src = to_bytes(&[1u16, 2, 3]);
        let out = convert_to_vec(&src, DataType::UInt16, DataType::UInt16, 3).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn int_to_float() {
        let src = to_bytes(&[-3i32, 0, 7]);
        let out = convert_to_vec(&src, DataType::Int32, DataType::Float64, 3).unwrap();
        assert_eq!(from_bytes::<f64>(&out), vec![-3.0, 0.0, 7.0]);
    }

    #[test]
    fn float_to_uint8_truncates() {
        let src = to_bytes(&[3.99f64, 256.0 + 5.5]);
        let out = convert_to_vec(&src, DataType::Float64, DataType::UInt8, 2).unwrap();
        assert_eq!(from_bytes::<u8>(&out), vec![3, 5]);
    }

    #[test]
    fn nan_and_infinity_pass_through_floats() {
        let src = to_bytes(&[f64::NAN, f64::NEG_INFINITY, f64::INFINITY]);
        let out = convert_to_vec(&src, DataType::Float64, DataType::Float32, 3).unwrap();
        let back = from_bytes::<f32>(&out);
        assert!(back[0].is_nan());
        assert_eq!(back[1], f32::NEG_INFINITY);
        assert_eq!(back[2], f32::INFINITY);
    }

    #[test]
    fn complex64_to_uint64() {
        let src = to_bytes(&[Complex::new(8.0f32, 0.0)]);
        let out = convert_to_vec(&src, DataType::Complex64, DataType::UInt64, 1).unwrap();
        assert_eq!(from_bytes::<u64>(&out), vec![8]);
    }

    #[test]
    fn short_source_rejected() {
        let src = [0u8; 3];
        let result = convert_to_vec(&src, DataType::UInt16, DataType::UInt8, 2);
        assert!(matches!(result, Err(TypeError::BufferTooSmall { .. })));
    }

    #[test]
    fn every_pair_is_defined() {
        let src = vec![0u8; 16];
        for from in DataType::ALL {
            for to in DataType::ALL {
                assert!(convert_to_vec(&src, from, to, 1).is_ok(), "{from} -> {to}");
            }
        }
    }

    proptest! {
        #[test]
        fn i64_through_f64_roundtrips_within_53_bits(v in -(1i64 << 53)..(1i64 << 53)) {
            let wide = convert_to_vec(&to_bytes(&[v]), DataType::Int64, DataType::Float64, 1).unwrap();
            let back = convert_to_vec(&wide, DataType::Float64, DataType::Int64, 1).unwrap();
            prop_assert_eq!(from_bytes::<i64>(&back), vec![v]);
        }

        #[test]
        fn widening_then_narrowing_is_lossless(v in any::<i16>()) {
            let wide = convert_to_vec(&to_bytes(&[v]), DataType::Int16, DataType::Int64, 1).unwrap();
            let back = convert_to_vec(&wide, DataType::Int64, DataType::Int16, 1).unwrap();
            prop_assert_eq!(from_bytes::<i16>(&back), vec![v]);
        }

        #[test]
        fn narrowing_keeps_low_bits(v in any::<u32>()) {
            let out = convert_to_vec(&to_bytes(&[v]), DataType::UInt32, DataType::UInt8, 1).unwrap();
            prop_assert_eq!(from_bytes::<u8>(&out), vec![v as u8]);
        }
    }
}
