//! Recursive evaluation of fields.
//!
//! Every call into the dispatcher enters through [`Dirfile::descend`], which
//! returns a [`Descent`] guard. The guard holds one level of the session's
//! recursion budget and gives it back when dropped, so an early `?` return
//! anywhere below cannot leave the counter unbalanced. Cycles in the entry
//! graph are caught by this budget running out.
//!
//! Sample positions are absolute and measured in the evaluated field's own
//! rate; frame arithmetic happens once, in the session facade. The frame
//! offset applies only where a RAW field addresses its data file.

mod extent;
mod read;
mod write;

use crate::dirfile::Dirfile;
use crate::entry::{Entry, EntryKind};
use crate::error::{CoreError, CoreResult};
use crate::linterp::LinterpTable;
use dirfile_types::{from_bytes, NativeType};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// One level of recursion held against the session's ceiling.
pub(crate) struct Descent<'a> {
    session: &'a mut Dirfile,
}

impl Deref for Descent<'_> {
    type Target = Dirfile;

    fn deref(&self) -> &Dirfile {
        self.session
    }
}

impl DerefMut for Descent<'_> {
    fn deref_mut(&mut self) -> &mut Dirfile {
        self.session
    }
}

impl Drop for Descent<'_> {
    fn drop(&mut self) {
        self.session.recursion_depth -= 1;
    }
}

/// Offsets an absolute sample position, failing if it would go negative.
pub(crate) fn shift_start(s0: u64, shift: i64) -> CoreResult<u64> {
    s0.checked_add_signed(shift).ok_or_else(|| {
        CoreError::range(format!("sample {s0} shifted by {shift} is out of range"))
    })
}

/// Number of samples, at `spf` per frame, that precede the first frame
/// stored in a data file.
pub(crate) fn offset_samples(frame_offset: i64, spf: u32) -> CoreResult<i64> {
    frame_offset
        .checked_mul(i64::from(spf))
        .ok_or_else(|| CoreError::range(format!("frame offset {frame_offset} overflows")))
}

/// Index into an input sampled at `spf_in` for output sample `s` of a field
/// sampled at `spf_out`.
fn resample_index(s: u64, spf_in: u32, spf_out: u32) -> u64 {
    (u128::from(s) * u128::from(spf_in) / u128::from(spf_out)) as u64
}

impl Dirfile {
    /// Takes one level of recursion for evaluating `code`.
    pub(crate) fn descend(&mut self, code: &str) -> CoreResult<Descent<'_>> {
        if self.recursion_depth >= self.config.max_recursion {
            return Err(CoreError::recursion_limit(code));
        }
        self.recursion_depth += 1;
        Ok(Descent { session: self })
    }

    /// Position in a RAW field's data file of sample `s0`.
    pub(crate) fn file_sample(&self, code: &str, s0: u64, spf: u32) -> CoreResult<u64> {
        let lead = offset_samples(self.config.frame_offset, spf)?;
        lead.checked_neg()
            .and_then(|back| s0.checked_add_signed(back))
            .ok_or_else(|| {
                CoreError::range(format!("sample {s0} of {code} precedes the frame offset"))
            })
    }

    /// Resolves a field code, following aliases.
    pub(crate) fn lookup(&self, code: &str) -> CoreResult<Arc<Entry>> {
        self.table.resolve(code, self.config.max_recursion)
    }

    /// Samples per frame of a field. Derived fields run at the rate of
    /// their first input.
    pub(crate) fn spf_of(&mut self, code: &str) -> CoreResult<u32> {
        let mut d = self.descend(code)?;
        let entry = d.lookup(code)?;
        match &entry.kind {
            EntryKind::Raw { spf, .. } => Ok(*spf),
            EntryKind::Index
            | EntryKind::Const { .. }
            | EntryKind::CArray { .. }
            | EntryKind::String { .. } => Ok(1),
            _ => match entry.in_fields().first() {
                Some(input) => d.spf_of(input),
                None => Err(CoreError::internal(format!("{code} has no inputs"))),
            },
        }
    }

    /// Reads `ns` samples of `code` from `s0` as `T`.
    pub(crate) fn read_as<T: NativeType>(
        &mut self,
        code: &str,
        s0: u64,
        ns: usize,
    ) -> CoreResult<Vec<T>> {
        let mut buf = vec![0u8; T::DATA_TYPE.bytes_for(ns)];
        let n = self.read_samples(code, s0, ns, T::DATA_TYPE, &mut buf)?;
        buf.truncate(T::DATA_TYPE.bytes_for(n));
        Ok(from_bytes(&buf))
    }

    /// Reads `code` over a window expressed at rate `spf_out`, picking the
    /// input sample that covers each output sample.
    pub(crate) fn read_aligned<T: NativeType>(
        &mut self,
        code: &str,
        s0: u64,
        ns: usize,
        spf_out: u32,
    ) -> CoreResult<Vec<T>> {
        let spf_in = self.spf_of(code)?;
        if spf_in == spf_out || ns == 0 {
            return self.read_as(code, s0, ns);
        }

        let first = resample_index(s0, spf_in, spf_out);
        let end = s0
            .checked_add(ns as u64 - 1)
            .ok_or_else(|| CoreError::range(format!("window of {code} ends past the last sample")))?;
        let last = resample_index(end, spf_in, spf_out);
        let span = (last - first + 1) as usize;
        let values: Vec<T> = self.read_as(code, first, span)?;

        Ok((0..ns as u64)
            .map(|i| resample_index(s0 + i, spf_in, spf_out) - first)
            .take_while(|&k| (k as usize) < values.len())
            .map(|k| values[k as usize])
            .collect())
    }

    /// The lookup table of a LINTERP entry, loaded on first use.
    pub(crate) fn linterp_table(&mut self, entry: &Entry) -> CoreResult<Arc<LinterpTable>> {
        if let Some(table) = self.linterp_tables.get(&entry.code) {
            return Ok(Arc::clone(table));
        }
        let EntryKind::Linterp { table, .. } = &entry.kind else {
            return Err(CoreError::internal(format!("{} is not a LINTERP", entry.code)));
        };
        let path = self.root.join(table);
        let loaded = Arc::new(LinterpTable::load(&entry.code, &path)?);
        tracing::debug!(field = %entry.code, points = loaded.point_count(), "loaded lookup table");
        self.linterp_tables
            .insert(entry.code.clone(), Arc::clone(&loaded));
        Ok(loaded)
    }
}
