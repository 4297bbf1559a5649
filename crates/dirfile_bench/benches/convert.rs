//! Type conversion and byte-order benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dirfile_bench::utils::random_bytes;
use dirfile_types::{convert, swap_in_place, DataType};

const SAMPLES: usize = 4096;

/// Benchmark widening and narrowing conversions.
fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");
    group.throughput(Throughput::Elements(SAMPLES as u64));

    let pairs = [
        (DataType::UInt16, DataType::UInt16),
        (DataType::UInt16, DataType::Float64),
        (DataType::Int32, DataType::Int8),
        (DataType::Float64, DataType::Int64),
        (DataType::Float32, DataType::Complex128),
    ];

    for (from, to) in pairs {
        let src = match from {
            DataType::UInt16 => random_bytes::<u16>(SAMPLES),
            DataType::Int32 => random_bytes::<i32>(SAMPLES),
            DataType::Float32 => random_bytes::<f32>(SAMPLES),
            _ => random_bytes::<f64>(SAMPLES),
        };
        let mut dst = vec![0u8; to.bytes_for(SAMPLES)];
        let id = format!("{}_to_{}", from.name(), to.name());

        group.bench_function(BenchmarkId::from_parameter(id), |b| {
            b.iter(|| {
                convert(black_box(&src), from, &mut dst, to, SAMPLES).unwrap();
                black_box(&dst);
            });
        });
    }

    group.finish();
}

/// Benchmark byte swapping.
fn bench_swap(c: &mut Criterion) {
    let mut group = c.benchmark_group("swap");

    for ty in [DataType::UInt16, DataType::Float64, DataType::Complex128] {
        group.throughput(Throughput::Bytes(ty.bytes_for(SAMPLES) as u64));
        let mut buf = vec![0x5au8; ty.bytes_for(SAMPLES)];

        group.bench_with_input(BenchmarkId::from_parameter(ty.name()), &ty, |b, &ty| {
            b.iter(|| {
                swap_in_place(black_box(&mut buf), ty, SAMPLES);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_convert, bench_swap);
criterion_main!(benches);
