//! Field lengths and reverse frame lookup.

use super::offset_samples;
use crate::channel::ChannelRequest;
use crate::dirfile::Dirfile;
use crate::entry::{Entry, EntryKind};
use crate::error::{CoreError, CoreResult};
use dirfile_types::DataType;

impl Dirfile {
    /// Number of samples in `code`, or `None` for a field with no end.
    /// A RAW field's count includes the frames skipped by the frame offset.
    pub(crate) fn eof_of(&mut self, code: &str) -> CoreResult<Option<u64>> {
        let mut d = self.descend(code)?;
        let entry = d.lookup(code)?;
        match &entry.kind {
            EntryKind::Raw { data_type, spf } => {
                let stored = d.raw_size(&entry, *data_type)?;
                let lead = offset_samples(d.config.frame_offset, *spf)?;
                Ok(Some(stored.saturating_add_signed(lead)))
            }
            EntryKind::Index => Ok(None),
            EntryKind::Const { .. } | EntryKind::CArray { .. } | EntryKind::String { .. } => {
                Err(CoreError::unsupported_field_type(
                    code,
                    "literal fields have no length in samples",
                ))
            }
            EntryKind::Phase { input, shift } => Ok(d
                .eof_of(input)?
                .map(|n| n.saturating_add_signed(shift.saturating_neg()))),
            EntryKind::Linterp { input, .. }
            | EntryKind::Bit { input, .. }
            | EntryKind::SignedBit { input, .. }
            | EntryKind::Polynom { input, .. }
            | EntryKind::Recip { input, .. } => d.eof_of(input),
            EntryKind::Lincom { .. }
            | EntryKind::Multiply { .. }
            | EntryKind::Divide { .. }
            | EntryKind::Window { .. }
            | EntryKind::Mplex { .. } => {
                let inputs = entry.in_fields();
                let spf = match inputs.first() {
                    Some(first) => d.spf_of(first)?,
                    None => return Err(CoreError::internal(format!("{code} has no inputs"))),
                };
                let mut shortest: Option<u64> = None;
                for input in inputs {
                    let Some(n) = d.eof_of(input)? else {
                        continue;
                    };
                    let spf_in = d.spf_of(input)?;
                    let n = (u128::from(n) * u128::from(spf) / u128::from(spf_in)) as u64;
                    shortest = Some(shortest.map_or(n, |s| s.min(n)));
                }
                Ok(shortest)
            }
        }
    }

    /// Size in samples of a RAW field's data file; a file not written yet
    /// has size zero.
    fn raw_size(&mut self, entry: &Entry, raw_type: DataType) -> CoreResult<u64> {
        let fragment = self
            .fragments
            .get_mut(entry.fragment_index)
            .ok_or_else(|| CoreError::internal(format!("{} has no fragment", entry.code)))?;
        let request = ChannelRequest {
            code: &entry.code,
            root: &self.root,
            writing: false,
        };
        match self.channels.acquire(request, fragment, &self.registry) {
            Ok(channel) => Ok(channel.file().size(raw_type)?),
            Err(e) if e.is_missing_data() => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Fractional sample at which a monotonic field crosses `value`,
    /// searching samples `start..end`.
    ///
    /// The crossing is interpolated between the bracketing samples; a value
    /// outside the searched range is extrapolated from the first or last pair.
    pub(crate) fn sample_num(
        &mut self,
        code: &str,
        value: f64,
        start: u64,
        end: u64,
    ) -> CoreResult<f64> {
        let ns = usize::try_from(end.saturating_sub(start))
            .map_err(|_| CoreError::range("search window too large"))?;
        let data: Vec<f64> = self.read_as(code, start, ns)?;
        if data.len() < 2 {
            return Err(CoreError::range(format!(
                "{code} has {} samples in the search window, need two",
                data.len()
            )));
        }

        let last = data.len() - 1;
        let rising = data[last] >= data[0];
        let bracket = data.windows(2).position(|pair| {
            let (lo, hi) = if pair[0] <= pair[1] {
                (pair[0], pair[1])
            } else {
                (pair[1], pair[0])
            };
            lo <= value && value <= hi
        });
        let i = match bracket {
            Some(i) => i,
            None if (value < data[0]) == rising => 0,
            None => last - 1,
        };

        let (y0, y1) = (data[i], data[i + 1]);
        let offset = if y1 == y0 { 0.0 } else { (value - y0) / (y1 - y0) };
        Ok(start as f64 + i as f64 + offset)
    }
}
