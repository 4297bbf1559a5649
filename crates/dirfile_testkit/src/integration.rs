//! Cross-crate integration test helpers.
//!
//! Provides utilities for testing the session, the dispatcher and the
//! encodings together.

use crate::fixtures::TestDirfile;
use dirfile_core::{Dirfile, Metadata};
use std::collections::{BTreeMap, HashMap};

/// A test harness that remembers every sample it writes.
pub struct IntegrationHarness {
    /// The dirfile under test.
    pub dirfile: TestDirfile,
    written: HashMap<String, BTreeMap<u64, f64>>,
}

impl IntegrationHarness {
    /// Creates a harness over an in-memory dirfile.
    pub fn new(metadata: Metadata) -> Self {
        Self::over(TestDirfile::memory(metadata))
    }

    /// Creates a harness over an existing fixture.
    pub fn over(dirfile: TestDirfile) -> Self {
        Self {
            dirfile,
            written: HashMap::new(),
        }
    }

    /// Writes `values` to `code` from sample `first_sample` and tracks them.
    pub fn put(&mut self, code: &str, first_sample: u64, values: &[f64]) {
        let first = i64::try_from(first_sample).expect("Sample offset out of range");
        let n = self
            .dirfile
            .put_data(code, 0, first, 0, values.len(), values)
            .expect("Failed to put samples");
        assert_eq!(n, values.len(), "Short write to {code}");

        let tracked = self.written.entry(code.to_owned()).or_default();
        for (s, v) in (first_sample..).zip(values) {
            tracked.insert(s, *v);
        }
    }

    /// Reads `n` samples of `code` from `first_sample`.
    pub fn get(&mut self, code: &str, first_sample: u64, n: usize) -> Vec<f64> {
        let first = i64::try_from(first_sample).expect("Sample offset out of range");
        let mut out = vec![0.0; n];
        let got = self
            .dirfile
            .get_data(code, 0, first, 0, n, &mut out)
            .expect("Failed to get samples");
        out.truncate(got);
        out
    }

    /// Verifies every tracked sample reads back as written.
    pub fn verify_all(&mut self) {
        let fields: Vec<(String, Vec<(u64, f64)>)> = self
            .written
            .iter()
            .map(|(code, samples)| (code.clone(), samples.iter().map(|(s, v)| (*s, *v)).collect()))
            .collect();
        for (code, samples) in fields {
            for (s, expected) in samples {
                let actual = self.get(&code, s, 1);
                assert_eq!(actual.len(), 1, "Sample {s} of {code} missing");
                assert!(
                    (actual[0] - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                    "Sample {s} of {code}: expected {expected}, got {}",
                    actual[0]
                );
            }
        }
    }

    /// Returns the count of tracked samples.
    pub fn tracked_count(&self) -> usize {
        self.written.values().map(BTreeMap::len).sum()
    }
}

/// Checks on writes through derived fields.
pub mod inversion {
    use super::*;

    /// Writes `values` through the derived field `code` and checks that
    /// reading `code` returns them, and that `raw` holds `expected_raw`.
    pub fn check_round_trip(
        d: &mut Dirfile,
        code: &str,
        raw: &str,
        values: &[f64],
        expected_raw: &[f64],
    ) {
        d.put_data(code, 0, 0, 0, values.len(), values)
            .expect("Failed to write derived field");

        let mut back = vec![0.0; values.len()];
        d.get_data(code, 0, 0, 0, values.len(), &mut back)
            .expect("Failed to read derived field");
        assert_eq!(back, values, "{code} did not read back as written");

        let mut stored = vec![0.0; expected_raw.len()];
        d.get_data(raw, 0, 0, 0, expected_raw.len(), &mut stored)
            .expect("Failed to read raw field");
        assert_eq!(stored, expected_raw, "{raw} holds the wrong samples");
    }

    /// Checks that writing `code` is refused without touching any data.
    pub fn check_refused(d: &mut Dirfile, code: &str) {
        let _ = d.error_count();
        assert!(d.put_data(code, 0, 0, 0, 1, &[1.0f64]).is_err());
        assert_eq!(d.error_count(), 1);
    }
}

/// Checks on field extents.
pub mod extents {
    use super::*;

    /// Checks that `code` ends after `frames` whole frames.
    pub fn check_frames(d: &mut Dirfile, code: &str, frames: u64) {
        let spf = u64::from(d.spf(code).expect("Failed to get spf"));
        assert_eq!(d.eof(code).expect("Failed to get eof"), frames * spf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{scenarios, DirfileBuilder};
    use dirfile_core::{DataType, Entry, LincomTerm};

    fn harness_metadata() -> Metadata {
        Metadata::single_fragment()
            .with_entry(Entry::raw("a", DataType::Float64, 2))
            .with_entry(Entry::raw("b", DataType::Int32, 1))
    }

    #[test]
    fn test_integration_harness() {
        crate::fixtures::init_tracing();
        let mut harness = IntegrationHarness::new(harness_metadata());
        harness.put("a", 0, &[0.5, 1.5, 2.5]);
        harness.put("b", 4, &[-3.0, 7.0]);
        harness.put("a", 1, &[9.0]);
        assert_eq!(harness.tracked_count(), 5);

        harness.verify_all();
        assert_eq!(harness.get("a", 0, 3), vec![0.5, 9.0, 2.5]);
        assert_eq!(harness.get("b", 0, 6), vec![0.0, 0.0, 0.0, 0.0, -3.0, 7.0]);
    }

    #[test]
    fn test_lincom_inversion() {
        let mut fixture = DirfileBuilder::new()
            .raw::<i16>("raw", &[], 1)
            .entry(Entry::lincom("cal", vec![LincomTerm::new("raw", 0.5, -1.0)]))
            .build();
        inversion::check_round_trip(&mut fixture, "cal", "raw", &[-1.0, 0.0, 2.5], &[0.0, 2.0, 7.0]);
    }

    #[test]
    fn test_refused_writes() {
        let mut fixture = scenarios::ramp(1).build();
        let before = fixture.file_bytes("data");
        for code in ["square", "INDEX"] {
            inversion::check_refused(&mut fixture, code);
        }
        assert_eq!(fixture.file_bytes("data"), before);
    }

    #[test]
    fn test_extents() {
        let mut fixture = scenarios::mixed_rate(5).build();
        extents::check_frames(&mut fixture, "fast", 5);
        extents::check_frames(&mut fixture, "product", 5);
        extents::check_frames(&mut fixture, "sum", 5);
    }
}
