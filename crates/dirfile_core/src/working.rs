//! Arithmetic sample types used while computing derived fields.

use dirfile_types::{Complex, NativeType};
use std::ops::{Add, Div, Mul, Sub};

/// A sample type derived-field arithmetic is carried out in.
///
/// Real requests compute in `f64`; complex requests in `Complex<f64>`.
pub(crate) trait Working:
    NativeType
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    fn from_f64(v: f64) -> Self;

    fn nan() -> Self;
}

impl Working for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }

    fn nan() -> Self {
        f64::NAN
    }
}

impl Working for Complex<f64> {
    fn from_f64(v: f64) -> Self {
        Complex::real(v)
    }

    fn nan() -> Self {
        Complex::new(f64::NAN, f64::NAN)
    }
}

/// Evaluates `a[0] + a[1] x + a[2] x^2 + ...` by Horner's rule.
pub(crate) fn polynomial<W: Working>(a: &[f64], x: W) -> W {
    a.iter()
        .rev()
        .fold(W::from_f64(0.0), |acc, &c| acc * x + W::from_f64(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horner() {
        assert_eq!(polynomial(&[1.0, 2.0, 3.0], 2.0f64), 17.0);
        assert_eq!(polynomial(&[4.0], 100.0f64), 4.0);
    }

    #[test]
    fn complex_polynomial() {
        let i = Complex::new(0.0, 1.0);
        // 1 + i^2 = 0
        assert_eq!(polynomial(&[1.0, 0.0, 1.0], i), Complex::new(0.0, 0.0));
    }
}
