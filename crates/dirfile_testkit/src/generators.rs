//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use dirfile_core::{Entry, LincomTerm, WindowOp};
use dirfile_types::DataType;
use proptest::prelude::*;

/// Strategy for any member of the type lattice.
pub fn data_type_strategy() -> impl Strategy<Value = DataType> {
    prop::sample::select(DataType::ALL.to_vec())
}

/// Strategy for the non-complex types.
pub fn real_type_strategy() -> impl Strategy<Value = DataType> {
    data_type_strategy().prop_filter("must not be complex", |ty| !ty.is_complex())
}

/// Strategy for the integer types.
pub fn integer_type_strategy() -> impl Strategy<Value = DataType> {
    data_type_strategy().prop_filter("must be an integer type", |ty| ty.is_integer())
}

/// Strategy for `(bitnum, numbits)` spans that fit in 64 bits.
pub fn bit_span_strategy() -> impl Strategy<Value = (u32, u32)> {
    (0u32..64).prop_flat_map(|bitnum| (Just(bitnum), 1..=64 - bitnum))
}

/// Strategy for valid field codes.
pub fn field_code_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for `(first_frame, num_frames)` windows inside `0..nframes`.
pub fn frame_window_strategy(nframes: usize) -> impl Strategy<Value = (usize, usize)> {
    (0..nframes.max(1))
        .prop_flat_map(move |first| (Just(first), 0..=nframes.saturating_sub(first)))
}

/// Strategy for an invertible LINCOM term over `field`: the slope stays
/// well away from zero.
pub fn lincom_term_strategy(field: String) -> impl Strategy<Value = LincomTerm> {
    (
        prop_oneof![-100.0..-0.01f64, 0.01..100.0f64],
        -1000.0..1000.0f64,
    )
        .prop_map(move |(m, b)| LincomTerm::new(field.clone(), m, b))
}

/// Strategy for a window comparison.
pub fn window_op_strategy() -> impl Strategy<Value = WindowOp> {
    prop::sample::select(vec![
        WindowOp::Lt,
        WindowOp::Le,
        WindowOp::Gt,
        WindowOp::Ge,
        WindowOp::Eq,
        WindowOp::Ne,
        WindowOp::Set,
        WindowOp::Clr,
    ])
}

/// Strategy for an entry named `code` derived from the single field
/// `input`.
///
/// Covers LINCOM, BIT, PHASE, POLYNOM and RECIP.
pub fn derived_entry_strategy(code: String, input: String) -> impl Strategy<Value = Entry> {
    let lincom = {
        let code = code.clone();
        lincom_term_strategy(input.clone())
            .prop_map(move |term| Entry::lincom(code.clone(), vec![term]))
    };
    let bit = {
        let (code, input) = (code.clone(), input.clone());
        bit_span_strategy().prop_map(move |(bitnum, numbits)| {
            Entry::bit(code.clone(), input.clone(), bitnum, numbits)
        })
    };
    let phase = {
        let (code, input) = (code.clone(), input.clone());
        (0i64..16).prop_map(move |shift| Entry::phase(code.clone(), input.clone(), shift))
    };
    let polynom = {
        let (code, input) = (code.clone(), input.clone());
        prop::collection::vec(-10.0..10.0f64, 1..=6)
            .prop_map(move |a| Entry::polynom(code.clone(), input.clone(), a))
    };
    let recip = (0.5..50.0f64)
        .prop_map(move |dividend| Entry::recip(code.clone(), input.clone(), dividend));

    prop_oneof![lincom, bit, phase, polynom, recip]
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::DirfileBuilder;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn bit_span_fits(span in bit_span_strategy()) {
            let (bitnum, numbits) = span;
            prop_assert!(numbits >= 1);
            prop_assert!(bitnum + numbits <= 64);
        }

        #[test]
        fn frame_window_in_bounds(window in frame_window_strategy(10)) {
            let (first, n) = window;
            prop_assert!(first + n <= 10);
        }

        #[test]
        fn field_code_is_valid(code in field_code_strategy()) {
            let first = code.chars().next();
            prop_assert!(first.is_some_and(|c| c.is_ascii_lowercase()));
        }

        #[test]
        fn real_types_are_not_complex(ty in real_type_strategy()) {
            prop_assert!(ty.is_integer() || ty.is_float());
        }

        #[test]
        fn integer_types_are_integers(ty in integer_type_strategy()) {
            prop_assert!(!ty.is_float() && !ty.is_complex());
        }

        #[test]
        fn derived_entries_validate(
            entry in derived_entry_strategy("out".into(), "data".into())
        ) {
            prop_assert!(entry.validate(1).is_ok());
            prop_assert_eq!(entry.in_fields(), vec!["data"]);
        }

        #[test]
        fn derived_entries_read(
            entry in derived_entry_strategy("out".into(), "data".into())
        ) {
            let values: Vec<u32> = (1..=32).collect();
            let mut fixture = DirfileBuilder::new().raw("data", &values, 4).entry(entry).build();
            let mut out = [0.0f64; 4];
            let n = fixture.get_data("out", 0, 0, 1, 0, &mut out).unwrap();
            prop_assert_eq!(n, 4);
        }

        #[test]
        fn lincom_writes_invert(
            term in lincom_term_strategy("data".into()),
            values in prop::collection::vec(-1.0e3..1.0e3f64, 1..16),
        ) {
            let mut fixture = DirfileBuilder::new()
                .raw::<f64>("data", &[], 1)
                .entry(Entry::lincom("lin", vec![term]))
                .build();
            fixture.put_data("lin", 0, 0, 0, values.len(), &values).unwrap();
            let back = fixture.read_all::<f64>("lin").unwrap();
            prop_assert_eq!(back.len(), values.len());
            for (got, want) in back.iter().zip(&values) {
                prop_assert!((got - want).abs() <= 1e-6 * want.abs().max(1.0));
            }
        }

        #[test]
        fn window_reads_whole_frames(op in window_op_strategy(), threshold in 0u8..8) {
            let values: Vec<u8> = (0..16).collect();
            let mut fixture = DirfileBuilder::new()
                .raw("data", &values, 1)
                .entry(Entry::window("w", "data", "data", op, f64::from(threshold)))
                .build();
            let mut out = [0.0f64; 16];
            prop_assert_eq!(fixture.get_data("w", 0, 0, 16, 0, &mut out).unwrap(), 16);
            for (x, v) in out.iter().zip(&values) {
                if op.admits(f64::from(*v), f64::from(threshold)) {
                    prop_assert_eq!(*x, f64::from(*v));
                } else {
                    prop_assert!(x.is_nan());
                }
            }
        }
    }
}
