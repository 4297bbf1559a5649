//! Shared setup for the dirfile benchmarks.

pub mod utils;
