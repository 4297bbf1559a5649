//! Test fixtures and dirfile helpers.
//!
//! Provides builders that lay out a dirfile's raw data, either in a
//! temporary directory or in a shared memory store, and open a session
//! over it.

use dirfile_core::{Config, Dirfile, EncodingKind, Endianness, Entry, Metadata, Protection};
use dirfile_storage::MemoryStore;
use dirfile_types::{to_bytes, DataType, NativeType};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Routes `tracing` output from the engine to the test harness.
///
/// Filtering follows `RUST_LOG`. Safe to call from every test; only the
/// first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Writes `values` in native byte order as the unencoded data file of
/// `code` under `dir`.
pub fn write_raw<T: NativeType>(dir: &Path, code: &str, values: &[T]) {
    fs::write(dir.join(code), to_bytes(values)).expect("Failed to write raw data file");
}

/// Where a [`TestDirfile`] keeps its data files.
enum Backing {
    Memory(MemoryStore),
    Disk(TempDir),
}

/// A test dirfile with automatic cleanup.
pub struct TestDirfile {
    /// The session.
    pub dirfile: Dirfile,
    metadata: Metadata,
    backing: Backing,
}

impl TestDirfile {
    /// Opens a read-write session over an empty memory store.
    pub fn memory(metadata: Metadata) -> Self {
        Self::memory_with(metadata, Config::new().read_write(), MemoryStore::new())
    }

    /// Opens a session over `store`.
    pub fn memory_with(metadata: Metadata, config: Config, store: MemoryStore) -> Self {
        let dirfile = Dirfile::open_in_memory(metadata.clone(), config, store.clone())
            .expect("Failed to open in-memory dirfile");
        Self {
            dirfile,
            metadata,
            backing: Backing::Memory(store),
        }
    }

    /// Opens a read-write session over an empty temporary directory.
    pub fn on_disk(metadata: Metadata) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self::on_disk_with(metadata, Config::new().read_write(), temp_dir)
    }

    /// Opens a session over the directory `temp_dir`, which the fixture
    /// then owns.
    pub fn on_disk_with(metadata: Metadata, config: Config, temp_dir: TempDir) -> Self {
        let dirfile = Dirfile::open(temp_dir.path(), metadata.clone(), config)
            .expect("Failed to open dirfile");
        Self {
            dirfile,
            metadata,
            backing: Backing::Disk(temp_dir),
        }
    }

    /// Returns the dirfile directory if disk-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        match &self.backing {
            Backing::Disk(dir) => Some(dir.path().to_path_buf()),
            Backing::Memory(_) => None,
        }
    }

    /// Returns the backing store if in-memory.
    pub fn store(&self) -> Option<&MemoryStore> {
        match &self.backing {
            Backing::Memory(store) => Some(store),
            Backing::Disk(_) => None,
        }
    }

    /// The stored bytes of a data file, named by its path relative to the
    /// dirfile directory. None if the file does not exist.
    pub fn file_bytes(&self, name: &str) -> Option<Vec<u8>> {
        match &self.backing {
            Backing::Memory(store) => store.get(Path::new(name)),
            Backing::Disk(dir) => fs::read(dir.path().join(name)).ok(),
        }
    }

    /// Closes the session, flushing it, and opens a fresh one over the same
    /// data with `config`.
    pub fn reopen(self, config: Config) -> Self {
        let Self {
            dirfile,
            metadata,
            backing,
        } = self;
        dirfile.close().expect("Failed to close dirfile");
        match backing {
            Backing::Memory(store) => Self::memory_with(metadata, config, store),
            Backing::Disk(dir) => Self::on_disk_with(metadata, config, dir),
        }
    }
}

impl std::ops::Deref for TestDirfile {
    type Target = Dirfile;

    fn deref(&self) -> &Self::Target {
        &self.dirfile
    }
}

impl std::ops::DerefMut for TestDirfile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dirfile
    }
}

/// Builds a single-fragment dirfile from RAW fields with data and any
/// derived entries.
///
/// # Example
///
/// ```rust
/// use dirfile_core::Entry;
/// use dirfile_testkit::DirfileBuilder;
///
/// let mut fixture = DirfileBuilder::new()
///     .raw("data", &[0u8, 1, 2, 3], 1)
///     .entry(Entry::phase("ahead", "data", 1))
///     .build_on_disk();
///
/// assert_eq!(fixture.read_all::<u8>("ahead").unwrap(), vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct DirfileBuilder {
    metadata: Metadata,
    files: Vec<(String, Vec<u8>)>,
    config: Config,
}

impl Default for DirfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DirfileBuilder {
    /// An empty read-write dirfile with one fragment.
    pub fn new() -> Self {
        Self {
            metadata: Metadata::single_fragment(),
            files: Vec::new(),
            config: Config::new().read_write(),
        }
    }

    /// Adds a RAW field of `T` holding `values`, stored natively.
    #[must_use]
    pub fn raw<T: NativeType>(self, code: &str, values: &[T], spf: u32) -> Self {
        self.raw_bytes(code, T::DATA_TYPE, spf, to_bytes(values))
    }

    /// Adds a RAW field whose data file holds `bytes` verbatim.
    #[must_use]
    pub fn raw_bytes(mut self, code: &str, data_type: DataType, spf: u32, bytes: Vec<u8>) -> Self {
        self.metadata.entries.push(Entry::raw(code, data_type, spf));
        self.files.push((code.to_owned(), bytes));
        self
    }

    /// Adds an entry without data.
    #[must_use]
    pub fn entry(mut self, entry: Entry) -> Self {
        self.metadata.entries.push(entry);
        self
    }

    /// Adds an alias.
    #[must_use]
    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.metadata.aliases.insert(alias.to_owned(), target.to_owned());
        self
    }

    /// Sets the reference field.
    #[must_use]
    pub fn reference(mut self, code: &str) -> Self {
        self.metadata.reference_field = Some(code.to_owned());
        self
    }

    /// Sets the encoding of the fragment.
    ///
    /// In-memory fixtures ignore it.
    #[must_use]
    pub fn encoding(mut self, encoding: EncodingKind) -> Self {
        self.fragment_mut().encoding = Some(encoding);
        self
    }

    /// Sets the byte order the fragment declares for its data files.
    #[must_use]
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.fragment_mut().endianness = endianness;
        self
    }

    /// Sets the fragment's protection level.
    #[must_use]
    pub fn protection(mut self, protection: Protection) -> Self {
        self.fragment_mut().protection = protection;
        self
    }

    /// Replaces the session configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// The metadata built so far.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn fragment_mut(&mut self) -> &mut dirfile_core::Fragment {
        &mut self.metadata.fragments[0]
    }

    /// Opens the dirfile over a memory store.
    pub fn build(self) -> TestDirfile {
        let store = MemoryStore::new();
        for (code, bytes) in self.files {
            store.insert(code, bytes);
        }
        let mut metadata = self.metadata;
        for fragment in &mut metadata.fragments {
            fragment.encoding = Some(EncodingKind::Memory);
        }
        TestDirfile::memory_with(metadata, self.config, store)
    }

    /// Writes the data files to a temporary directory and opens the
    /// dirfile there.
    pub fn build_on_disk(self) -> TestDirfile {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        for (code, bytes) in &self.files {
            fs::write(temp_dir.path().join(code), bytes).expect("Failed to write data file");
        }
        TestDirfile::on_disk_with(self.metadata, self.config, temp_dir)
    }
}

/// Runs a test against an in-memory dirfile.
///
/// # Example
///
/// ```rust
/// use dirfile_core::{DataType, Entry, Metadata};
/// use dirfile_testkit::with_temp_dirfile;
///
/// let metadata = Metadata::single_fragment().with_entry(Entry::raw("data", DataType::Int16, 1));
/// with_temp_dirfile(metadata, |d| {
///     d.put_data("data", 0, 0, 2, 0, &[-1i16, 1]).unwrap();
///     assert_eq!(d.nframes().unwrap(), 2);
/// });
/// ```
pub fn with_temp_dirfile<F, R>(metadata: Metadata, f: F) -> R
where
    F: FnOnce(&mut Dirfile) -> R,
{
    let mut fixture = TestDirfile::memory(metadata);
    f(&mut fixture.dirfile)
}

/// Runs a test against a dirfile in a temporary directory.
pub fn with_disk_dirfile<F, R>(metadata: Metadata, f: F) -> R
where
    F: FnOnce(&mut Dirfile, &Path) -> R,
{
    let mut fixture = TestDirfile::on_disk(metadata);
    let path = fixture.path().expect("Disk dirfile should have a path");
    f(&mut fixture.dirfile, &path)
}

/// Common dirfile layouts.
pub mod scenarios {
    use super::*;
    use dirfile_core::LincomTerm;

    /// Samples per frame of the `data` field in [`ramp`].
    pub const RAMP_SPF: u32 = 8;

    /// A UINT8 field `data` counting up from 1 over `nframes` frames of
    /// eight samples, with a few fields derived from it:
    ///
    /// - `lincom`: `2 * data + 3`
    /// - `bits`: bits 1 to 3 of `data`
    /// - `ahead`: `data` shifted forward one frame
    /// - `square`: `data` squared
    pub fn ramp(nframes: usize) -> DirfileBuilder {
        let spf = RAMP_SPF as usize;
        let data: Vec<u8> = (0..nframes * spf).map(|i| (i + 1) as u8).collect();
        DirfileBuilder::new()
            .raw("data", &data, RAMP_SPF)
            .entry(Entry::lincom(
                "lincom",
                vec![LincomTerm::new("data", 2.0, 3.0)],
            ))
            .entry(Entry::bit("bits", "data", 1, 3))
            .entry(Entry::phase("ahead", "data", i64::from(RAMP_SPF)))
            .entry(Entry::polynom("square", "data", vec![0.0, 0.0, 1.0]))
    }

    /// Two RAW fields at different rates: `fast` (FLOAT64, four samples
    /// per frame) and `slow` (INT32, one sample per frame), both holding
    /// `0, 1, 2, …`, with their product `product` and sum `sum`.
    pub fn mixed_rate(nframes: usize) -> DirfileBuilder {
        let fast: Vec<f64> = (0..nframes * 4).map(|i| i as f64).collect();
        let slow: Vec<i32> = (0..nframes as i32).collect();
        DirfileBuilder::new()
            .raw("fast", &fast, 4)
            .raw("slow", &slow, 1)
            .entry(Entry::multiply("product", "fast", "slow"))
            .entry(Entry::lincom(
                "sum",
                vec![
                    LincomTerm::new("fast", 1.0, 0.0),
                    LincomTerm::new("slow", 1.0, 0.0),
                ],
            ))
    }
}
