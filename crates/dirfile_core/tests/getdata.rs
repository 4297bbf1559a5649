//! Reading fields from dirfiles on disk.

use dirfile_core::{
    Config, CoreError, DataType, Dirfile, EncodingKind, Endianness, Entry, ErrorKind, Fragment,
    LincomTerm, Literal, Metadata, WindowOp,
};
use dirfile_types::{host_is_big_endian, to_bytes, Complex};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_file(dir: &Path, name: &str, bytes: &[u8]) {
    fs::write(dir.join(name), bytes).unwrap();
}

fn open(dir: &Path, metadata: Metadata) -> Dirfile {
    Dirfile::open(dir, metadata, Config::default()).unwrap()
}

fn bytes_0_to_255(dir: &Path) {
    let data: Vec<u8> = (0..=255).collect();
    write_file(dir, "data", &data);
}

#[test]
fn uint8_frame_five() {
    let dir = tempdir().unwrap();
    bytes_0_to_255(dir.path());
    let mut d = open(
        dir.path(),
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt8, 1)),
    );

    let mut buf = [0u8; 1];
    let n = d.get_data("data", 5, 0, 1, 0, &mut buf).unwrap();
    assert_eq!(n, 1);
    assert_eq!(buf[0], 5);
    assert_eq!(d.error(), None);
    assert_eq!(d.fragment(0).unwrap().encoding, Some(EncodingKind::Unencoded));
}

#[test]
fn frames_scale_by_spf() {
    let dir = tempdir().unwrap();
    let data: Vec<u16> = (0..40).collect();
    write_file(dir.path(), "data", &to_bytes(&data));
    let mut d = open(
        dir.path(),
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt16, 2)),
    );

    let mut buf = [0u16; 2];
    assert_eq!(d.get_data("data", 5, 0, 1, 0, &mut buf).unwrap(), 2);
    assert_eq!(buf, [10, 11]);

    let mut buf = [0u16; 3];
    assert_eq!(d.get_data("data", 5, 1, 1, 1, &mut buf).unwrap(), 3);
    assert_eq!(buf, [11, 12, 13]);
}

#[test]
fn uint64_full_width() {
    let dir = tempdir().unwrap();
    let data: Vec<u64> = (0..128u64).map(|i| i * 0x0200_0000_0000_0001).collect();
    write_file(dir.path(), "data", &to_bytes(&data));
    let mut d = open(
        dir.path(),
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt64, 8)),
    );

    let mut buf = [0u64; 8];
    assert_eq!(d.get_data("data", 5, 0, 1, 0, &mut buf).unwrap(), 8);
    for (i, v) in buf.iter().enumerate() {
        assert_eq!(*v, 0x5000_0000_0000_0028 + i as u64 * 0x0200_0000_0000_0001);
    }
}

#[test]
fn foreign_byte_order_is_swapped() {
    let dir = tempdir().unwrap();
    let data: Vec<u16> = (0..128u16).map(|i| i.wrapping_mul(0x0201)).collect();
    write_file(dir.path(), "data", &to_bytes(&data));
    let foreign = if host_is_big_endian() {
        Endianness::Little
    } else {
        Endianness::Big
    };
    let metadata = Metadata {
        fragments: vec![Fragment::new(0, "format").with_endianness(foreign)],
        ..Metadata::default()
    }
    .with_entry(Entry::raw("data", DataType::UInt16, 1));
    let mut d = open(dir.path(), metadata);

    let mut buf = [0u16; 1];
    assert_eq!(d.get_data("data", 5, 0, 1, 0, &mut buf).unwrap(), 1);
    assert_eq!(buf[0], 0x050a);
}

#[test]
fn short_read_at_end_of_field() {
    let dir = tempdir().unwrap();
    bytes_0_to_255(dir.path());
    let mut d = open(
        dir.path(),
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt8, 1)),
    );

    let mut buf = [0u8; 10];
    assert_eq!(d.get_data("data", 250, 0, 10, 0, &mut buf).unwrap(), 6);
    assert_eq!(&buf[..6], &[250, 251, 252, 253, 254, 255]);
}

#[test]
fn conversion_on_read() {
    let dir = tempdir().unwrap();
    bytes_0_to_255(dir.path());
    let mut d = open(
        dir.path(),
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt8, 1)),
    );

    let mut f = [0.0f64; 2];
    d.get_data("data", 3, 0, 2, 0, &mut f).unwrap();
    assert_eq!(f, [3.0, 4.0]);

    let mut c = [Complex::default(); 1];
    d.get_data("data", 7, 0, 1, 0, &mut c).unwrap();
    assert_eq!(c[0], Complex::new(7.0f32, 0.0));
}

#[test]
fn lincom_of_two_inputs_with_different_rates() {
    let dir = tempdir().unwrap();
    let fast: Vec<u8> = (0..20).collect();
    let slow: Vec<u8> = vec![100, 200, 250];
    write_file(dir.path(), "fast", &fast);
    write_file(dir.path(), "slow", &slow);
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::raw("fast", DataType::UInt8, 4))
        .with_entry(Entry::raw("slow", DataType::UInt8, 1))
        .with_entry(Entry::lincom(
            "sum",
            vec![
                LincomTerm::new("fast", 2.0, 1.0),
                LincomTerm::new("slow", 1.0, 0.0),
            ],
        ));
    let mut d = open(dir.path(), metadata);

    assert_eq!(d.spf("sum").unwrap(), 4);
    let mut buf = [0.0f64; 8];
    assert_eq!(d.get_data("sum", 1, 0, 2, 0, &mut buf).unwrap(), 8);
    let expected: Vec<f64> = (4..12)
        .map(|i| 2.0 * f64::from(i) + 1.0 + if i < 8 { 200.0 } else { 250.0 })
        .collect();
    assert_eq!(buf.to_vec(), expected);
}

#[test]
fn bit_and_signed_bit() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "flags", &to_bytes(&[0b1110_0101u16, 0b0101_0000]));
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::raw("flags", DataType::UInt16, 1))
        .with_entry(Entry::bit("low", "flags", 0, 3))
        .with_entry(Entry::signed_bit("mid", "flags", 4, 4));
    let mut d = open(dir.path(), metadata);

    let mut low = [0u8; 2];
    d.get_data("low", 0, 0, 2, 0, &mut low).unwrap();
    assert_eq!(low, [0b101, 0b000]);

    let mut mid = [0i32; 2];
    d.get_data("mid", 0, 0, 2, 0, &mut mid).unwrap();
    assert_eq!(mid, [-2, 5]);
}

#[test]
fn phase_polynom_recip_and_index() {
    let dir = tempdir().unwrap();
    bytes_0_to_255(dir.path());
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::raw("data", DataType::UInt8, 1))
        .with_entry(Entry::phase("ahead", "data", 3))
        .with_entry(Entry::polynom("poly", "data", vec![1.0, 0.0, 2.0]))
        .with_entry(Entry::recip("inv", "data", 10.0));
    let mut d = open(dir.path(), metadata);

    let mut buf = [0u8; 2];
    d.get_data("ahead", 10, 0, 2, 0, &mut buf).unwrap();
    assert_eq!(buf, [13, 14]);

    let mut f = [0.0f64; 2];
    d.get_data("poly", 3, 0, 2, 0, &mut f).unwrap();
    assert_eq!(f, [19.0, 33.0]);

    d.get_data("inv", 4, 0, 2, 0, &mut f).unwrap();
    assert_eq!(f, [2.5, 2.0]);

    let mut idx = [0u32; 3];
    d.get_data("INDEX", 1000, 0, 3, 0, &mut idx).unwrap();
    assert_eq!(idx, [1000, 1001, 1002]);
}

#[test]
fn phase_before_start_is_range_error() {
    let dir = tempdir().unwrap();
    bytes_0_to_255(dir.path());
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::raw("data", DataType::UInt8, 1))
        .with_entry(Entry::phase("behind", "data", -5));
    let mut d = open(dir.path(), metadata);

    let mut buf = [0u8; 1];
    let err = d.get_data("behind", 2, 0, 1, 0, &mut buf).unwrap_err();
    assert!(matches!(err, CoreError::RangeError { .. }));
    assert_eq!(d.error(), Some(ErrorKind::RangeError));
    assert_eq!(d.recursion_depth(), 0);
}

#[test]
fn multiply_divide_window_mplex() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a", &to_bytes(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]));
    write_file(dir.path(), "b", &to_bytes(&[2.0f64, 2.0, 2.0, 0.5, 0.5, 0.5]));
    write_file(dir.path(), "sel", &to_bytes(&[0i8, 1, 0, 1, 0, 1]));
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::raw("a", DataType::Float64, 1))
        .with_entry(Entry::raw("b", DataType::Float64, 1))
        .with_entry(Entry::raw("sel", DataType::Int8, 1))
        .with_entry(Entry::multiply("ab", "a", "b"))
        .with_entry(Entry::divide("a_b", "a", "b"))
        .with_entry(Entry::window("odd", "a", "sel", WindowOp::Eq, 1.0))
        .with_entry(Entry::mplex("mux", "a", "sel", 1, 2));
    let mut d = open(dir.path(), metadata);

    let mut f = [0.0f64; 6];
    d.get_data("ab", 0, 0, 6, 0, &mut f).unwrap();
    assert_eq!(f, [2.0, 4.0, 6.0, 2.0, 2.5, 3.0]);

    d.get_data("a_b", 0, 0, 6, 0, &mut f).unwrap();
    assert_eq!(f, [0.5, 1.0, 1.5, 8.0, 10.0, 12.0]);

    d.get_data("odd", 0, 0, 6, 0, &mut f).unwrap();
    assert!(f[0].is_nan() && f[2].is_nan() && f[4].is_nan());
    assert_eq!([f[1], f[3], f[5]], [2.0, 4.0, 6.0]);

    let mut ints = [9i32; 6];
    d.get_data("odd", 0, 0, 6, 0, &mut ints).unwrap();
    assert_eq!(ints, [0, 2, 0, 4, 0, 6]);

    d.get_data("mux", 0, 0, 6, 0, &mut f).unwrap();
    assert_eq!(f, [0.0, 2.0, 2.0, 4.0, 4.0, 6.0]);

    // the lookback seeds the value from before the window
    let mut tail = [0.0f64; 2];
    d.get_data("mux", 2, 0, 2, 0, &mut tail).unwrap();
    assert_eq!(tail, [2.0, 4.0]);
}

#[test]
fn linterp_through_table() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "data", &[0, 1, 2, 3]);
    write_file(dir.path(), "table.lut", b"0 0\n2 10\n4 30\n");
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::raw("data", DataType::UInt8, 1))
        .with_entry(Entry::linterp("cal", "data", "table.lut"));
    let mut d = open(dir.path(), metadata);

    let mut f = [0.0f64; 4];
    d.get_data("cal", 0, 0, 4, 0, &mut f).unwrap();
    assert_eq!(f, [0.0, 5.0, 10.0, 20.0]);
}

#[test]
fn literals_read_through_get_data() {
    let dir = tempdir().unwrap();
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::constant("k", Literal::from_values(&[2.5f32])))
        .with_entry(Entry::carray("arr", Literal::from_values(&[1i16, 2, 3, 4])))
        .with_entry(Entry::string("s", "hello"));
    let mut d = open(dir.path(), metadata);

    let mut f = [0.0f64; 4];
    assert_eq!(d.get_data("k", 0, 0, 0, 4, &mut f).unwrap(), 1);
    assert_eq!(f[0], 2.5);

    let mut a = [0u8; 4];
    assert_eq!(d.get_data("arr", 0, 1, 0, 4, &mut a).unwrap(), 3);
    assert_eq!(&a[..3], &[2, 3, 4]);

    let mut s = [0u8; 5];
    assert_eq!(d.get_data("s", 0, 0, 0, 5, &mut s).unwrap(), 5);
    assert_eq!(&s, b"hello");

    let err = d.get_data("s", 0, 0, 0, 1, &mut f).unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedFieldType { .. }));
}

#[test]
fn unknown_field() {
    let dir = tempdir().unwrap();
    let mut d = open(dir.path(), Metadata::single_fragment());

    let mut buf = [0u8; 1];
    let err = d.get_data("nope", 0, 0, 1, 0, &mut buf).unwrap_err();
    assert!(matches!(err, CoreError::UnknownField { .. }));
    assert_eq!(d.error(), Some(ErrorKind::UnknownField));
    assert_eq!(d.error_string(), "unknown field: nope");
}

#[test]
fn missing_input_reports_unknown_field() {
    let dir = tempdir().unwrap();
    let mut d = open(
        dir.path(),
        Metadata::single_fragment().with_entry(Entry::phase("p", "ghost", 1)),
    );

    let mut buf = [0u8; 1];
    let err = d.get_data("p", 0, 0, 1, 0, &mut buf).unwrap_err();
    assert!(matches!(err, CoreError::UnknownField { code } if code == "ghost"));
}

#[test]
fn unresolved_encoding() {
    let dir = tempdir().unwrap();
    let mut d = open(
        dir.path(),
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt8, 1)),
    );

    let mut buf = [0u8; 1];
    let err = d.get_data("data", 0, 0, 1, 0, &mut buf).unwrap_err();
    assert!(matches!(err, CoreError::UnresolvedEncoding { .. }));
    assert_eq!(d.fragment(0).unwrap().encoding, None);
}

#[test]
fn text_encoding_is_detected() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "data.txt", b"1.5\n2.5\n3.5\n");
    let mut d = open(
        dir.path(),
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::Float32, 1)),
    );

    let mut f = [0.0f32; 3];
    assert_eq!(d.get_data("data", 0, 0, 3, 0, &mut f).unwrap(), 3);
    assert_eq!(f, [1.5, 2.5, 3.5]);
    assert_eq!(d.fragment(0).unwrap().encoding, Some(EncodingKind::Text));
}

#[test]
fn self_reference_hits_recursion_limit() {
    let dir = tempdir().unwrap();
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::lincom("loop", vec![LincomTerm::new("loop", 1.0, 0.0)]));
    let mut d = open(dir.path(), metadata);

    let mut buf = [0.0f64; 1];
    let err = d.get_data("loop", 0, 0, 1, 0, &mut buf).unwrap_err();
    assert!(matches!(err, CoreError::RecursionLimit { .. }));
    assert_eq!(d.recursion_depth(), 0);
}

#[test]
fn deep_chain_respects_configured_ceiling() {
    let dir = tempdir().unwrap();
    bytes_0_to_255(dir.path());
    let mut metadata =
        Metadata::single_fragment().with_entry(Entry::raw("p0", DataType::UInt8, 1));
    for i in 1..=6 {
        metadata = metadata.with_entry(Entry::phase(format!("p{i}"), format!("p{}", i - 1), 1));
    }

    let mut shallow =
        Dirfile::open(dir.path(), metadata.clone(), Config::new().max_recursion(4)).unwrap();
    let mut buf = [0u8; 1];
    assert!(matches!(
        shallow.get_data("p6", 0, 0, 1, 0, &mut buf),
        Err(CoreError::RecursionLimit { .. })
    ));

    let mut deep = open(dir.path(), metadata);
    deep.get_data("p6", 0, 0, 1, 0, &mut buf).unwrap();
    assert_eq!(buf[0], 6);
}

#[test]
fn buffer_too_small() {
    let dir = tempdir().unwrap();
    bytes_0_to_255(dir.path());
    let mut d = open(
        dir.path(),
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt8, 1)),
    );

    let mut buf = [0u8; 2];
    let err = d.get_data("data", 0, 0, 4, 0, &mut buf).unwrap_err();
    assert!(matches!(err, CoreError::BufferTooSmall { .. }));
}

#[test]
fn frame_offset_shifts_frames() {
    let dir = tempdir().unwrap();
    bytes_0_to_255(dir.path());
    let metadata =
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt8, 1));
    let mut d = Dirfile::open(dir.path(), metadata, Config::new().frame_offset(100)).unwrap();

    let mut buf = [0u8; 1];
    d.get_data("data", 105, 0, 1, 0, &mut buf).unwrap();
    assert_eq!(buf[0], 5);
    assert!(matches!(
        d.get_data("data", 99, 0, 1, 0, &mut buf),
        Err(CoreError::RangeError { .. })
    ));
    assert_eq!(d.eof("data").unwrap(), 356);
}

#[test]
fn index_ignores_frame_offset() {
    let dir = tempdir().unwrap();
    bytes_0_to_255(dir.path());
    let metadata =
        Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt8, 1));
    let mut d = Dirfile::open(dir.path(), metadata, Config::new().frame_offset(5)).unwrap();

    let mut frames = [0u64; 3];
    assert_eq!(d.get_data("INDEX", 7, 0, 3, 0, &mut frames).unwrap(), 3);
    assert_eq!(frames, [7, 8, 9]);
    assert_eq!(d.get_data("INDEX", 2, 0, 1, 0, &mut frames).unwrap(), 1);
    assert_eq!(frames[0], 2);
}

#[test]
fn huge_sample_offset_is_range_error() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "data", &to_bytes(&[1u64, 2, 3]));
    let metadata = Metadata::single_fragment().with_entry(Entry::raw("data", DataType::UInt64, 1));
    let mut d = open(dir.path(), metadata);

    let mut buf = [0u64; 1];
    let err = d.get_data("data", 0, i64::MAX / 2, 0, 1, &mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RangeError);
    assert_eq!(d.error_count(), 1);
}

#[test]
fn complex_lincom() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "data", &to_bytes(&[1.0f64, 2.0]));
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::raw("data", DataType::Float64, 1))
        .with_entry(Entry::lincom("scaled", vec![LincomTerm::new("data", 3.0, -1.0)]));
    let mut d = open(dir.path(), metadata);

    let mut c = [Complex::<f64>::default(); 2];
    d.get_data("scaled", 0, 0, 2, 0, &mut c).unwrap();
    assert_eq!(c, [Complex::new(2.0, 0.0), Complex::new(5.0, 0.0)]);
}
