//! Read vectors for the field algebra.
//!
//! Each vector lays out a few RAW fields, defines derived entries over
//! them, and records what reading one field must return. The vectors
//! serialize to JSON so another implementation can replay them.

use dirfile_core::{Config, CoreResult, Dirfile, Entry, LincomTerm, Metadata};
use dirfile_storage::MemoryStore;
use dirfile_types::{convert_to_vec, to_bytes, DataType};
use serde::{Deserialize, Serialize};

/// A RAW field and the samples its data file holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInput {
    /// Field code.
    pub code: String,
    /// On-disk sample type.
    pub data_type: DataType,
    /// Samples per frame.
    pub spf: u32,
    /// Samples, converted to `data_type` when the file is laid out.
    pub values: Vec<f64>,
}

impl RawInput {
    fn new(code: &str, data_type: DataType, spf: u32, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            code: code.into(),
            data_type,
            spf,
            values: values.into_iter().collect(),
        }
    }
}

/// A read that a conforming implementation must reproduce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Stored fields.
    pub raw: Vec<RawInput>,
    /// Derived fields.
    pub derived: Vec<Entry>,
    /// Field read.
    pub field: String,
    /// First frame of the read.
    pub first_frame: i64,
    /// Frames read.
    pub num_frames: usize,
    /// Samples returned, as FLOAT64.
    pub expected: Vec<f64>,
    /// Expected error kind (if this should fail).
    pub expected_error: Option<String>,
}

impl ReadVector {
    /// The vector's dirfile metadata.
    pub fn metadata(&self) -> Metadata {
        let raw = self
            .raw
            .iter()
            .map(|input| Entry::raw(input.code.as_str(), input.data_type, input.spf));
        Metadata {
            entries: raw.chain(self.derived.iter().cloned()).collect(),
            ..Metadata::single_fragment()
        }
    }

    /// Lays the vector out in memory and performs its read.
    ///
    /// # Errors
    ///
    /// Returns whatever error the read raises.
    pub fn run(&self) -> CoreResult<Vec<f64>> {
        let store = MemoryStore::new();
        for input in &self.raw {
            let bytes = convert_to_vec(
                &to_bytes(&input.values),
                DataType::Float64,
                input.data_type,
                input.values.len(),
            )?;
            store.insert(input.code.as_str(), bytes);
        }

        let mut dirfile = Dirfile::open_in_memory(self.metadata(), Config::default(), store)?;
        let spf = dirfile.spf(&self.field)? as usize;
        let mut out = vec![0.0f64; self.num_frames * spf];
        let n = dirfile.get_data(&self.field, self.first_frame, 0, self.num_frames, 0, &mut out)?;
        out.truncate(n);
        Ok(out)
    }

    /// Runs the vector and describes any disagreement with its
    /// expectation.
    pub fn check(&self) -> Result<(), String> {
        match (self.run(), &self.expected_error) {
            (Ok(actual), None) => {
                let matches = actual.len() == self.expected.len()
                    && actual
                        .iter()
                        .zip(&self.expected)
                        .all(|(a, e)| (a - e).abs() <= 1e-9 * e.abs().max(1.0));
                if matches {
                    Ok(())
                } else {
                    Err(format!("{}: expected {:?}, got {actual:?}", self.id, self.expected))
                }
            }
            (Err(err), Some(kind)) if err.kind().to_string() == *kind => Ok(()),
            (Ok(actual), Some(kind)) => Err(format!("{}: expected {kind}, got {actual:?}", self.id)),
            (Err(err), _) => Err(format!("{}: unexpected error: {err}", self.id)),
        }
    }
}

fn ramp(n: usize) -> impl Iterator<Item = f64> {
    (0..n).map(|i| i as f64)
}

/// Reads of stored fields.
pub fn raw_vectors() -> Vec<ReadVector> {
    vec![
        ReadVector {
            id: "raw_uint8_frame".into(),
            description: "One frame of a UINT8 field with eight samples per frame".into(),
            raw: vec![RawInput::new("data", DataType::UInt8, 8, ramp(64))],
            derived: vec![],
            field: "data".into(),
            first_frame: 5,
            num_frames: 1,
            expected: (40..48).map(f64::from).collect(),
            expected_error: None,
        },
        ReadVector {
            id: "raw_short_read".into(),
            description: "A window running past the end returns what is there".into(),
            raw: vec![RawInput::new("data", DataType::Int16, 2, ramp(6))],
            derived: vec![],
            field: "data".into(),
            first_frame: 2,
            num_frames: 4,
            expected: vec![4.0, 5.0],
            expected_error: None,
        },
        ReadVector {
            id: "raw_float_truncation".into(),
            description: "FLOAT64 input narrowed into an INT32 file truncates toward zero".into(),
            raw: vec![RawInput::new("data", DataType::Int32, 1, [1.9, -1.9, 2.5])],
            derived: vec![],
            field: "data".into(),
            first_frame: 0,
            num_frames: 3,
            expected: vec![1.0, -1.0, 2.0],
            expected_error: None,
        },
        ReadVector {
            id: "index_frames".into(),
            description: "INDEX counts frames".into(),
            raw: vec![],
            derived: vec![],
            field: "INDEX".into(),
            first_frame: 7,
            num_frames: 3,
            expected: vec![7.0, 8.0, 9.0],
            expected_error: None,
        },
    ]
}

/// Reads of derived fields.
pub fn derived_vectors() -> Vec<ReadVector> {
    let data = || RawInput::new("data", DataType::UInt16, 4, ramp(16));
    vec![
        ReadVector {
            id: "lincom_single".into(),
            description: "2 * data + 3".into(),
            raw: vec![data()],
            derived: vec![Entry::lincom("out", vec![LincomTerm::new("data", 2.0, 3.0)])],
            field: "out".into(),
            first_frame: 1,
            num_frames: 1,
            expected: vec![11.0, 13.0, 15.0, 17.0],
            expected_error: None,
        },
        ReadVector {
            id: "lincom_mixed_rate".into(),
            description: "Sum of a four-sample and a one-sample field".into(),
            raw: vec![
                data(),
                RawInput::new("slow", DataType::Float32, 1, [100.0, 200.0, 300.0, 400.0]),
            ],
            derived: vec![Entry::lincom(
                "out",
                vec![
                    LincomTerm::new("data", 1.0, 0.0),
                    LincomTerm::new("slow", 1.0, 0.0),
                ],
            )],
            field: "out".into(),
            first_frame: 2,
            num_frames: 1,
            expected: vec![308.0, 309.0, 310.0, 311.0],
            expected_error: None,
        },
        ReadVector {
            id: "bit_unsigned".into(),
            description: "Bits 2 to 3 of data".into(),
            raw: vec![data()],
            derived: vec![Entry::bit("out", "data", 2, 2)],
            field: "out".into(),
            first_frame: 1,
            num_frames: 2,
            expected: vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0],
            expected_error: None,
        },
        ReadVector {
            id: "bit_signed".into(),
            description: "Bits 0 to 2 of data, sign-extended".into(),
            raw: vec![data()],
            derived: vec![Entry::signed_bit("out", "data", 0, 3)],
            field: "out".into(),
            first_frame: 0,
            num_frames: 2,
            expected: vec![0.0, 1.0, 2.0, 3.0, -4.0, -3.0, -2.0, -1.0],
            expected_error: None,
        },
        ReadVector {
            id: "phase_forward".into(),
            description: "data shifted forward three samples".into(),
            raw: vec![data()],
            derived: vec![Entry::phase("out", "data", 3)],
            field: "out".into(),
            first_frame: 3,
            num_frames: 1,
            expected: vec![15.0],
            expected_error: None,
        },
        ReadVector {
            id: "phase_before_start".into(),
            description: "A backward shift cannot reach before sample zero".into(),
            raw: vec![data()],
            derived: vec![Entry::phase("out", "data", -2)],
            field: "out".into(),
            first_frame: 0,
            num_frames: 1,
            expected: vec![],
            expected_error: Some("RangeError".into()),
        },
        ReadVector {
            id: "polynom_quadratic".into(),
            description: "1 - data + data^2 / 2".into(),
            raw: vec![data()],
            derived: vec![Entry::polynom("out", "data", vec![1.0, -1.0, 0.5])],
            field: "out".into(),
            first_frame: 0,
            num_frames: 1,
            expected: vec![1.0, 0.5, 1.0, 2.5],
            expected_error: None,
        },
        ReadVector {
            id: "multiply_mixed_rate".into(),
            description: "Product of a four-sample and a one-sample field".into(),
            raw: vec![
                data(),
                RawInput::new("slow", DataType::Int8, 1, [1.0, -2.0, 3.0, -4.0]),
            ],
            derived: vec![Entry::multiply("out", "data", "slow")],
            field: "out".into(),
            first_frame: 1,
            num_frames: 1,
            expected: vec![-8.0, -10.0, -12.0, -14.0],
            expected_error: None,
        },
        ReadVector {
            id: "divide".into(),
            description: "data divided by a constant-valued field".into(),
            raw: vec![
                data(),
                RawInput::new("four", DataType::Float64, 4, [4.0; 16]),
            ],
            derived: vec![Entry::divide("out", "data", "four")],
            field: "out".into(),
            first_frame: 0,
            num_frames: 1,
            expected: vec![0.0, 0.25, 0.5, 0.75],
            expected_error: None,
        },
        ReadVector {
            id: "recip".into(),
            description: "12 / data".into(),
            raw: vec![data()],
            derived: vec![Entry::recip("out", "data", 12.0)],
            field: "out".into(),
            first_frame: 1,
            num_frames: 1,
            expected: vec![3.0, 2.4, 2.0, 12.0 / 7.0],
            expected_error: None,
        },
        ReadVector {
            id: "chain".into(),
            description: "A phase of a lincom of a bit field".into(),
            raw: vec![data()],
            derived: vec![
                Entry::bit("low", "data", 0, 2),
                Entry::lincom("scaled", vec![LincomTerm::new("low", 10.0, 0.0)]),
                Entry::phase("out", "scaled", 1),
            ],
            field: "out".into(),
            first_frame: 0,
            num_frames: 1,
            expected: vec![10.0, 20.0, 30.0, 0.0],
            expected_error: None,
        },
        ReadVector {
            id: "unknown_input".into(),
            description: "A derived field over a missing input".into(),
            raw: vec![data()],
            derived: vec![Entry::lincom("out", vec![LincomTerm::new("nope", 1.0, 0.0)])],
            field: "out".into(),
            first_frame: 0,
            num_frames: 1,
            expected: vec![],
            expected_error: Some("UnknownField".into()),
        },
    ]
}

/// All vectors, by group.
#[derive(Debug, Serialize, Deserialize)]
pub struct AllReadVectors {
    /// Stored-field reads.
    pub raw: Vec<ReadVector>,
    /// Derived-field reads.
    pub derived: Vec<ReadVector>,
}

/// Generate all read vectors as JSON for cross-implementation use.
pub fn all_vectors_json() -> String {
    let vectors = AllReadVectors {
        raw: raw_vectors(),
        derived: derived_vectors(),
    };

    serde_json::to_string_pretty(&vectors).expect("Failed to serialize vectors")
}
