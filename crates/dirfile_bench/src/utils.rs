//! Benchmark utilities.

use dirfile_core::{Config, Dirfile, Entry, LincomTerm, Metadata};
use dirfile_storage::MemoryStore;
use dirfile_types::{to_bytes, DataType, NativeType};
use rand::distributions::{Distribution, Standard};
use rand::Rng;

/// Generate `count` random samples of `T`.
pub fn random_samples<T>(count: usize) -> Vec<T>
where
    Standard: Distribution<T>,
{
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen()).collect()
}

/// Generate `count` random samples as raw native-order bytes of `T`.
pub fn random_bytes<T: NativeType>(count: usize) -> Vec<u8>
where
    Standard: Distribution<T>,
{
    to_bytes(&random_samples::<T>(count))
}

/// An in-memory dirfile with a UINT16 field `raw` of `nframes` frames at
/// `spf` samples per frame, and derived fields over it: `lincom`, `bits`,
/// `phase`, `polynom` and `product` (`raw` times `lincom`).
pub fn derived_dirfile(nframes: usize, spf: u32) -> Dirfile {
    let store = MemoryStore::new();
    store.insert("raw", random_bytes::<u16>(nframes * spf as usize));
    let metadata = Metadata::single_fragment()
        .with_entry(Entry::raw("raw", DataType::UInt16, spf))
        .with_entry(Entry::lincom("lincom", vec![LincomTerm::new("raw", 0.25, -3.0)]))
        .with_entry(Entry::bit("bits", "raw", 4, 6))
        .with_entry(Entry::phase("phase", "raw", 7))
        .with_entry(Entry::polynom("polynom", "raw", vec![1.0, 0.5, 0.25, 0.125]))
        .with_entry(Entry::multiply("product", "raw", "lincom"));
    Dirfile::open_in_memory(metadata, Config::default(), store)
        .expect("Failed to open benchmark dirfile")
}
