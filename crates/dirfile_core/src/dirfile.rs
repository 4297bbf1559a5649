//! The dirfile session.

use crate::channel::ChannelCache;
use crate::config::Config;
use crate::entry::{Entry, EntryKind, EntryType};
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::fragment::Fragment;
use crate::linterp::LinterpTable;
use crate::table::{EntryTable, Metadata};
use dirfile_storage::{EncodingKind, EncodingRegistry, MemoryStore};
use dirfile_types::{copy_from_bytes, to_bytes, DataType, NativeType};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Outcome of the most recent call, kept for callers that poll for errors
/// instead of inspecting results.
#[derive(Debug, Default)]
struct Status {
    last: Option<(ErrorKind, String)>,
    count: usize,
}

/// An open dirfile.
///
/// The session owns the entry table, the fragment list and every open data
/// file. It is not meant to be shared between threads; wrap it in a lock if
/// several threads need it.
///
/// Frame-addressed calls compute the absolute sample window as
/// `first_sample + first_frame * spf` with `num_samples + num_frames * spf`
/// samples, where `spf` is the field's samples per frame. The configured
/// frame offset shifts only where RAW fields address their data files, so
/// INDEX always reports the requested frame.
///
/// Dropping a session releases its data files without flushing them; call
/// [`Dirfile::close`] to flush.
pub struct Dirfile {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
    pub(crate) table: EntryTable,
    pub(crate) fragments: Vec<Fragment>,
    pub(crate) channels: ChannelCache,
    pub(crate) registry: EncodingRegistry,
    pub(crate) linterp_tables: HashMap<String, Arc<LinterpTable>>,
    pub(crate) recursion_depth: usize,
    reference_field: Option<String>,
    status: Status,
}

impl Dirfile {
    /// Opens the dirfile at `path` with the default encodings.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory does not exist (and
    /// `create_dirs` is off), or `InvalidEntry` for malformed metadata.
    pub fn open(path: impl AsRef<Path>, metadata: Metadata, config: Config) -> CoreResult<Self> {
        Self::open_with_registry(path, metadata, config, EncodingRegistry::default())
    }

    /// Opens the dirfile at `path` with a custom set of encodings.
    ///
    /// # Errors
    ///
    /// See [`Dirfile::open`].
    pub fn open_with_registry(
        path: impl AsRef<Path>,
        metadata: Metadata,
        config: Config,
        registry: EncodingRegistry,
    ) -> CoreResult<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.is_dir() {
            if config.create_dirs && config.access_mode.is_writable() {
                fs::create_dir_all(&root)?;
            } else {
                return Err(CoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("dirfile directory {} does not exist", root.display()),
                )));
            }
        }
        Self::assemble(root, metadata, config, registry)
    }

    /// Opens a session whose data files live in `store` instead of on disk.
    ///
    /// Fragments without an explicit encoding are bound to the memory
    /// encoding.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntry` for malformed metadata.
    pub fn open_in_memory(
        mut metadata: Metadata,
        config: Config,
        store: MemoryStore,
    ) -> CoreResult<Self> {
        for fragment in &mut metadata.fragments {
            fragment.encoding.get_or_insert(EncodingKind::Memory);
        }
        Self::assemble(PathBuf::new(), metadata, config, EncodingRegistry::memory(store))
    }

    fn assemble(
        root: PathBuf,
        metadata: Metadata,
        config: Config,
        registry: EncodingRegistry,
    ) -> CoreResult<Self> {
        let mut fragments = metadata.fragments;
        for (i, fragment) in fragments.iter_mut().enumerate() {
            fragment.index = i;
        }
        let table = EntryTable::build(metadata.entries, metadata.aliases, fragments.len())?;

        if let Some(reference) = &metadata.reference_field {
            let entry = table.resolve(reference, config.max_recursion)?;
            if entry.entry_type() != EntryType::Raw {
                return Err(CoreError::invalid_entry(
                    reference.as_str(),
                    "reference field must be RAW",
                ));
            }
        }

        debug!(
            path = %root.display(),
            fields = table.len(),
            fragments = fragments.len(),
            mode = ?config.access_mode,
            "opened dirfile"
        );

        Ok(Self {
            root,
            config,
            table,
            fragments,
            channels: ChannelCache::new(),
            registry,
            linterp_tables: HashMap::new(),
            recursion_depth: 0,
            reference_field: metadata.reference_field,
            status: Status::default(),
        })
    }

    /// Runs a public operation: clears the last error, then records the
    /// error the operation returns, if any.
    fn tracked<R>(&mut self, op: impl FnOnce(&mut Self) -> CoreResult<R>) -> CoreResult<R> {
        self.status.last = None;
        let result = op(self);
        if let Err(e) = &result {
            self.status.last = Some((e.kind(), e.to_string()));
            self.status.count += 1;
        }
        result
    }

    fn require_writable(&self) -> CoreResult<()> {
        if self.config.access_mode.is_writable() {
            Ok(())
        } else {
            Err(CoreError::access_denied("dirfile opened read-only"))
        }
    }

    /// Converts frame addressing to an absolute sample window.
    fn window(
        &mut self,
        code: &str,
        first_frame: i64,
        first_sample: i64,
        num_frames: usize,
        num_samples: usize,
    ) -> CoreResult<(u64, usize)> {
        let spf = self.spf_of(code)?;
        let start = first_frame
            .checked_mul(i64::from(spf))
            .and_then(|s| s.checked_add(first_sample))
            .ok_or_else(|| CoreError::range("sample offset overflows"))?;
        let s0 = u64::try_from(start)
            .map_err(|_| CoreError::range(format!("window starts at negative sample {start}")))?;
        let ns = num_frames
            .checked_mul(spf as usize)
            .and_then(|n| n.checked_add(num_samples))
            .ok_or_else(|| CoreError::range("sample count overflows"))?;
        if s0.checked_add(ns as u64).is_none() {
            return Err(CoreError::range("window ends past the last sample"));
        }
        Ok((s0, ns))
    }

    /// Reads a window of `code` as type `ty` into `out`.
    ///
    /// Returns the number of samples read, which is short at end of field.
    ///
    /// # Errors
    ///
    /// Returns `BufferTooSmall` if `out` cannot hold the window, or any
    /// error raised while evaluating the field.
    pub fn get_data_bytes(
        &mut self,
        code: &str,
        first_frame: i64,
        first_sample: i64,
        num_frames: usize,
        num_samples: usize,
        ty: DataType,
        out: &mut [u8],
    ) -> CoreResult<usize> {
        self.tracked(|d| {
            let (s0, ns) = d.window(code, first_frame, first_sample, num_frames, num_samples)?;
            let needed = ty.bytes_for(ns);
            if out.len() < needed {
                return Err(CoreError::BufferTooSmall {
                    needed,
                    actual: out.len(),
                });
            }
            d.read_samples(code, s0, ns, ty, out)
        })
    }

    /// Reads a window of `code` into `out`, converting to `T`.
    ///
    /// # Errors
    ///
    /// See [`Dirfile::get_data_bytes`].
    pub fn get_data<T: NativeType>(
        &mut self,
        code: &str,
        first_frame: i64,
        first_sample: i64,
        num_frames: usize,
        num_samples: usize,
        out: &mut [T],
    ) -> CoreResult<usize> {
        let ty = T::DATA_TYPE;
        let mut buf = vec![0u8; ty.bytes_for(out.len())];
        let n = self.get_data_bytes(
            code,
            first_frame,
            first_sample,
            num_frames,
            num_samples,
            ty,
            &mut buf,
        )?;
        copy_from_bytes(&buf[..ty.bytes_for(n)], out);
        Ok(n)
    }

    /// Writes a window of `code` from `data` of type `ty`.
    ///
    /// Returns the number of samples written.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` on a read-only session (before any file is
    /// touched) or a protected fragment, `NonInvertibleWrite` for fields
    /// without an inverse, `BufferTooSmall` if `data` is shorter than the
    /// window, or any error raised while evaluating the field.
    pub fn put_data_bytes(
        &mut self,
        code: &str,
        first_frame: i64,
        first_sample: i64,
        num_frames: usize,
        num_samples: usize,
        ty: DataType,
        data: &[u8],
    ) -> CoreResult<usize> {
        self.tracked(|d| {
            d.require_writable()?;
            let (s0, ns) = d.window(code, first_frame, first_sample, num_frames, num_samples)?;
            let needed = ty.bytes_for(ns);
            if data.len() < needed {
                return Err(CoreError::BufferTooSmall {
                    needed,
                    actual: data.len(),
                });
            }
            d.write_samples(code, s0, ns, ty, data)
        })
    }

    /// Writes a window of `code` from `data`.
    ///
    /// # Errors
    ///
    /// See [`Dirfile::put_data_bytes`].
    pub fn put_data<T: NativeType>(
        &mut self,
        code: &str,
        first_frame: i64,
        first_sample: i64,
        num_frames: usize,
        num_samples: usize,
        data: &[T],
    ) -> CoreResult<usize> {
        self.put_data_bytes(
            code,
            first_frame,
            first_sample,
            num_frames,
            num_samples,
            T::DATA_TYPE,
            &to_bytes(data),
        )
    }

    fn entry_of_type(&self, code: &str, want: EntryType) -> CoreResult<Arc<Entry>> {
        let entry = self.lookup(code)?;
        if entry.entry_type() == want {
            Ok(entry)
        } else {
            Err(CoreError::unsupported_field_type(
                code,
                format!("expected {want:?}, found {:?}", entry.entry_type()),
            ))
        }
    }

    /// Value of a CONST field, converted to `T`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField`, or `UnsupportedFieldType` if `code` is not a
    /// CONST.
    pub fn get_constant<T: NativeType>(&mut self, code: &str) -> CoreResult<T> {
        self.tracked(|d| {
            let entry = d.entry_of_type(code, EntryType::Const)?;
            let mut buf = vec![0u8; T::DATA_TYPE.size()];
            d.read_entry_literal(&entry, 0, 1, T::DATA_TYPE, &mut buf)?;
            Ok(T::read_ne(&buf))
        })
    }

    /// Sets a CONST field, converting from `T` to its stored type.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` on a read-only session or a format-protected
    /// fragment, or `UnsupportedFieldType` if `code` is not a CONST.
    pub fn put_constant<T: NativeType>(&mut self, code: &str, value: T) -> CoreResult<()> {
        self.tracked(|d| {
            d.require_writable()?;
            let entry = d.entry_of_type(code, EntryType::Const)?;
            d.write_samples(&entry.code, 0, 1, T::DATA_TYPE, &to_bytes(&[value]))?;
            Ok(())
        })
    }

    /// Number of values in a CARRAY field.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField`, or `UnsupportedFieldType` if `code` is not a
    /// CARRAY.
    pub fn carray_len(&mut self, code: &str) -> CoreResult<usize> {
        self.tracked(|d| {
            let entry = d.entry_of_type(code, EntryType::CArray)?;
            match &entry.kind {
                EntryKind::CArray { values } => Ok(values.len()),
                _ => Err(CoreError::internal(format!("{code} is not a CARRAY"))),
            }
        })
    }

    /// Reads `out.len()` values of a CARRAY starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if the slice runs past the end of the array.
    pub fn get_carray_slice<T: NativeType>(
        &mut self,
        code: &str,
        start: usize,
        out: &mut [T],
    ) -> CoreResult<()> {
        self.tracked(|d| {
            let entry = d.entry_of_type(code, EntryType::CArray)?;
            let mut buf = vec![0u8; T::DATA_TYPE.bytes_for(out.len())];
            d.read_entry_literal(&entry, start, out.len(), T::DATA_TYPE, &mut buf)?;
            copy_from_bytes(&buf, out);
            Ok(())
        })
    }

    /// Overwrites values of a CARRAY starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if the slice runs past the end of the array, or
    /// `AccessDenied` on a read-only session or format-protected fragment.
    pub fn put_carray_slice<T: NativeType>(
        &mut self,
        code: &str,
        start: usize,
        data: &[T],
    ) -> CoreResult<()> {
        self.tracked(|d| {
            d.require_writable()?;
            let entry = d.entry_of_type(code, EntryType::CArray)?;
            d.write_samples(
                &entry.code,
                start as u64,
                data.len(),
                T::DATA_TYPE,
                &to_bytes(data),
            )?;
            Ok(())
        })
    }

    /// Every value of a CARRAY.
    ///
    /// # Errors
    ///
    /// See [`Dirfile::get_carray_slice`].
    pub fn get_carray<T: NativeType>(&mut self, code: &str) -> CoreResult<Vec<T>> {
        let len = self.carray_len(code)?;
        let mut out = vec![T::default(); len];
        self.get_carray_slice(code, 0, &mut out)?;
        Ok(out)
    }

    /// Overwrites a CARRAY from its first value.
    ///
    /// # Errors
    ///
    /// See [`Dirfile::put_carray_slice`].
    pub fn put_carray<T: NativeType>(&mut self, code: &str, data: &[T]) -> CoreResult<()> {
        self.put_carray_slice(code, 0, data)
    }

    /// Value of a STRING field.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField`, or `UnsupportedFieldType` if `code` is not a
    /// STRING.
    pub fn get_string(&mut self, code: &str) -> CoreResult<String> {
        self.tracked(|d| {
            let entry = d.entry_of_type(code, EntryType::String)?;
            match &entry.kind {
                EntryKind::String { value } => Ok(value.clone()),
                _ => Err(CoreError::internal(format!("{code} is not a STRING"))),
            }
        })
    }

    /// Replaces the value of a STRING field.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` on a read-only session or format-protected
    /// fragment, or `UnsupportedFieldType` if `code` is not a STRING.
    pub fn put_string(&mut self, code: &str, value: &str) -> CoreResult<()> {
        self.tracked(|d| {
            d.require_writable()?;
            let entry = d.entry_of_type(code, EntryType::String)?;
            d.replace_string(&entry, value)
        })
    }

    fn read_entry_literal(
        &self,
        entry: &Entry,
        start: usize,
        count: usize,
        ty: DataType,
        out: &mut [u8],
    ) -> CoreResult<()> {
        match &entry.kind {
            EntryKind::Const { value } | EntryKind::CArray { values: value } => {
                value.read_slice(start, count, ty, out)
            }
            _ => Err(CoreError::internal(format!(
                "{} has no numeric payload",
                entry.code
            ))),
        }
    }

    /// Samples per frame of `code`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` or `RecursionLimit`.
    pub fn spf(&mut self, code: &str) -> CoreResult<u32> {
        self.tracked(|d| d.spf_of(code))
    }

    fn eof_samples(&mut self, code: &str) -> CoreResult<u64> {
        self.eof_of(code)?
            .ok_or_else(|| CoreError::unsupported_field_type(code, "field has no end"))
    }

    /// Number of samples in `code`, counted from frame zero.
    ///
    /// Derived fields end where their shortest input ends.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFieldType` for literals and for fields that never
    /// end, such as INDEX.
    pub fn eof(&mut self, code: &str) -> CoreResult<u64> {
        self.tracked(|d| d.eof_samples(code))
    }

    /// Number of frames in the dirfile: the length of the reference field,
    /// or of the first RAW field if none is set. Zero without RAW fields.
    ///
    /// # Errors
    ///
    /// Returns any error raised sizing the reference field.
    pub fn nframes(&mut self) -> CoreResult<u64> {
        self.tracked(|d| {
            let reference = match &d.reference_field {
                Some(code) => code.clone(),
                None => match d.table.first_raw() {
                    Some(code) => code.to_owned(),
                    None => return Ok(0),
                },
            };
            let n = d.eof_samples(&reference)?;
            let spf = d.spf_of(&reference)?;
            Ok(n / u64::from(spf))
        })
    }

    /// Fractional frame at which a monotonic field reaches `value`, searching
    /// frames `frame_start..frame_end`. A `frame_end` of zero searches to the
    /// end of the field.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if the window holds fewer than two samples.
    pub fn frame_num(
        &mut self,
        code: &str,
        value: f64,
        frame_start: i64,
        frame_end: i64,
    ) -> CoreResult<f64> {
        self.tracked(|d| {
            let spf = d.spf_of(code)?;
            let to_sample =
                |frame: i64| u64::try_from(frame).map_or(0, |f| f.saturating_mul(u64::from(spf)));
            // frames before the offset have no stored samples
            let start = to_sample(frame_start.max(d.config.frame_offset));
            let end = if frame_end == 0 {
                d.eof_of(code)?
                    .ok_or_else(|| CoreError::unsupported_field_type(code, "field has no end"))?
            } else {
                to_sample(frame_end)
            };
            let sample = d.sample_num(code, value, start, end)?;
            Ok(sample / f64::from(spf))
        })
    }

    /// Flushes the data files behind `code`, or every open file.
    ///
    /// # Errors
    ///
    /// Returns the first flush error.
    pub fn flush(&mut self, code: Option<&str>) -> CoreResult<()> {
        self.tracked(|d| match code {
            Some(code) => d.flush_field(code),
            None => d.channels.flush(None),
        })
    }

    fn flush_field(&mut self, code: &str) -> CoreResult<()> {
        let mut d = self.descend(code)?;
        let entry = d.lookup(code)?;
        if entry.entry_type() == EntryType::Raw {
            return d.channels.flush(Some(&entry.code));
        }
        for input in entry.in_fields() {
            d.flush_field(input)?;
        }
        Ok(())
    }

    /// Flushes and closes the data file of a RAW field. It is reopened on
    /// next use.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFieldType` if `code` is not RAW.
    pub fn raw_close(&mut self, code: &str) -> CoreResult<()> {
        self.tracked(|d| {
            let entry = d.entry_of_type(code, EntryType::Raw)?;
            d.channels.close(&entry.code)
        })
    }

    /// Flushes every data file and ends the session.
    ///
    /// # Errors
    ///
    /// Returns the first close error; every file is released regardless.
    pub fn close(mut self) -> CoreResult<()> {
        debug!(path = %self.root.display(), "closing dirfile");
        self.channels.close_all()
    }

    /// Ends the session without flushing.
    pub fn discard(mut self) {
        self.channels.discard_all();
    }

    /// Kind of the error raised by the last call, if it failed.
    #[must_use]
    pub fn error(&self) -> Option<ErrorKind> {
        self.status.last.as_ref().map(|(kind, _)| *kind)
    }

    /// Number of errors raised since the previous call to this method.
    pub fn error_count(&mut self) -> usize {
        std::mem::take(&mut self.status.count)
    }

    /// Description of the error raised by the last call, or `"Success"`.
    #[must_use]
    pub fn error_string(&self) -> String {
        self.status
            .last
            .as_ref()
            .map_or_else(|| "Success".to_owned(), |(_, message)| message.clone())
    }

    /// Directory of the dirfile.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fragment `index`, if it exists.
    #[must_use]
    pub fn fragment(&self, index: usize) -> Option<&Fragment> {
        self.fragments.get(index)
    }

    /// All fragments.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// The entry `code` resolves to. Does not touch the error state.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` or `RecursionLimit`.
    pub fn entry(&self, code: &str) -> CoreResult<Arc<Entry>> {
        self.lookup(code)
    }

    /// Visible field codes in definition order.
    #[must_use]
    pub fn field_list(&self) -> Vec<&str> {
        self.table.field_list()
    }

    /// Visible field codes of one type.
    #[must_use]
    pub fn field_list_by_type(&self, ty: EntryType) -> Vec<&str> {
        self.table.field_list_by_type(ty)
    }

    /// Number of visible fields.
    #[must_use]
    pub fn nfields(&self) -> usize {
        self.table.field_list().len()
    }

    /// Current recursion depth; zero between calls.
    #[must_use]
    pub fn recursion_depth(&self) -> usize {
        self.recursion_depth
    }

    /// Number of open data files.
    #[must_use]
    pub fn open_channels(&self) -> usize {
        self.channels.len()
    }

    /// Reads an entire field as `T`, from its first sample to its end.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFieldType` for fields without an end, or any
    /// error raised while evaluating the field.
    pub fn read_all<T: NativeType>(&mut self, code: &str) -> CoreResult<Vec<T>> {
        self.tracked(|d| {
            let n = d
                .eof_of(code)?
                .ok_or_else(|| CoreError::unsupported_field_type(code, "field has no end"))?;
            let n = usize::try_from(n).map_err(|_| CoreError::range("field too long for memory"))?;
            d.read_as(code, 0, n)
        })
    }
}

impl Drop for Dirfile {
    fn drop(&mut self) {
        self.channels.discard_all();
    }
}

impl fmt::Debug for Dirfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dirfile")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("fields", &self.table.len())
            .field("fragments", &self.fragments.len())
            .field("open_channels", &self.channels.len())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
