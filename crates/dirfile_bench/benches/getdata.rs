//! Read and write path benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dirfile_bench::utils::{derived_dirfile, random_samples};
use dirfile_core::{Config, DataType, Dirfile, EncodingKind, Entry, Fragment, Metadata};
use tempfile::TempDir;

const NFRAMES: usize = 256;
const SPF: u32 = 20;

/// Benchmark reading one field of each kind.
fn bench_read_fields(c: &mut Criterion) {
    let mut group = c.benchmark_group("getdata");
    group.throughput(Throughput::Elements((NFRAMES * SPF as usize) as u64));

    let mut dirfile = derived_dirfile(NFRAMES + 1, SPF);
    let mut out = vec![0.0f64; NFRAMES * SPF as usize];

    for code in ["raw", "lincom", "bits", "phase", "polynom", "product", "INDEX"] {
        group.bench_function(BenchmarkId::from_parameter(code), |b| {
            b.iter(|| {
                let n = dirfile
                    .get_data(black_box(code), 0, 0, NFRAMES, 0, &mut out)
                    .unwrap();
                black_box(n);
            });
        });
    }

    group.finish();
}

/// Benchmark frame-sized reads of a derived field.
fn bench_read_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("getdata_window");
    let mut dirfile = derived_dirfile(NFRAMES, SPF);

    for frames in [1usize, 16, 128] {
        group.throughput(Throughput::Elements((frames * SPF as usize) as u64));
        let mut out = vec![0.0f64; frames * SPF as usize];

        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            let mut first = 0usize;
            b.iter(|| {
                let n = dirfile
                    .get_data("lincom", first as i64, 0, frames, 0, &mut out)
                    .unwrap();
                black_box(n);
                first = (first + frames) % (NFRAMES - frames);
            });
        });
    }

    group.finish();
}

/// Benchmark writing through the unencoded encoding.
fn bench_put_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("putdata_file");
    group.sample_size(20);

    for frames in [1usize, 64] {
        let samples = frames * SPF as usize;
        group.throughput(Throughput::Elements(samples as u64));

        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            let dir = TempDir::new().unwrap();
            let metadata = Metadata {
                fragments: vec![Fragment::new(0, "format").with_encoding(EncodingKind::Unencoded)],
                ..Metadata::default()
            }
            .with_entry(Entry::raw("data", DataType::Float32, SPF));
            let mut dirfile =
                Dirfile::open(dir.path(), metadata, Config::new().read_write()).unwrap();
            let data = random_samples::<f32>(samples);

            b.iter(|| {
                let n = dirfile
                    .put_data("data", 0, 0, frames, 0, black_box(&data))
                    .unwrap();
                black_box(n);
            });
            dirfile.flush(None).unwrap();
        });
    }

    group.finish();
}

criterion_group!(benches, bench_read_fields, bench_read_window, bench_put_file);
criterion_main!(benches);
