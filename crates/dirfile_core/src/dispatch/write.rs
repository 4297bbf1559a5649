//! The write half of the dispatcher.
//!
//! Only transforms with an inverse are writable: RAW, single-term LINCOM,
//! LINTERP, BIT, SBIT and PHASE pass the samples down to their input, and
//! the literal kinds store them in place. Everything else refuses.

use super::read::bit_mask;
use super::shift_start;
use crate::channel::ChannelRequest;
use crate::dirfile::Dirfile;
use crate::entry::{Entry, EntryKind};
use crate::error::{CoreError, CoreResult};
use crate::fragment::Fragment;
use crate::working::Working;
use dirfile_types::{convert_to_vec, from_bytes, swap_in_place, to_bytes, Complex, DataType, NativeType};
use tracing::{debug, trace};

/// Converts `ns` samples of type `ty` to `T`.
fn decode<T: NativeType>(data: &[u8], ty: DataType, ns: usize) -> CoreResult<Vec<T>> {
    Ok(from_bytes(&convert_to_vec(data, ty, T::DATA_TYPE, ns)?))
}

impl Dirfile {
    /// Writes `ns` samples of type `ty` from `data` to `code` starting at
    /// absolute sample `s0`. Returns the number of samples written.
    pub(crate) fn write_samples(
        &mut self,
        code: &str,
        s0: u64,
        ns: usize,
        ty: DataType,
        data: &[u8],
    ) -> CoreResult<usize> {
        let mut d = self.descend(code)?;
        let entry = d.lookup(code)?;
        trace!(field = code, s0, ns, %ty, "write");
        d.write_entry(&entry, s0, ns, ty, data)
    }

    fn write_entry(
        &mut self,
        entry: &Entry,
        s0: u64,
        ns: usize,
        ty: DataType,
        data: &[u8],
    ) -> CoreResult<usize> {
        match &entry.kind {
            EntryKind::Raw { data_type, spf } => {
                let start = self.file_sample(&entry.code, s0, *spf)?;
                self.write_raw(entry, *data_type, start, ns, ty, data)
            }
            EntryKind::Lincom { terms } => match terms.as_slice() {
                [term] if ty.is_complex() => {
                    self.write_linear::<Complex<f64>>(&term.field, term.m, term.b, s0, ns, ty, data)
                }
                [term] => self.write_linear::<f64>(&term.field, term.m, term.b, s0, ns, ty, data),
                _ => Err(CoreError::non_invertible(&entry.code)),
            },
            EntryKind::Linterp { input, .. } => {
                let inverse = self.linterp_table(entry)?.inverse();
                let x: Vec<f64> = decode::<f64>(data, ty, ns)?
                    .into_iter()
                    .map(|y| inverse.interpolate(y))
                    .collect();
                self.write_samples(input, s0, ns, DataType::Float64, &to_bytes(&x))
            }
            EntryKind::Bit {
                input,
                bitnum,
                numbits,
            } => {
                let values: Vec<u64> = decode(data, ty, ns)?;
                self.write_bits(input, *bitnum, *numbits, s0, &values)
            }
            EntryKind::SignedBit {
                input,
                bitnum,
                numbits,
            } => {
                let values: Vec<u64> = decode::<i64>(data, ty, ns)?
                    .into_iter()
                    .map(|v| v as u64)
                    .collect();
                self.write_bits(input, *bitnum, *numbits, s0, &values)
            }
            EntryKind::Phase { input, shift } => {
                let start = shift_start(s0, *shift)?;
                self.write_samples(input, start, ns, ty, data)
            }
            EntryKind::Const { .. } | EntryKind::CArray { .. } | EntryKind::String { .. } => {
                self.write_literal(entry, s0, ns, ty, data)
            }
            EntryKind::Polynom { .. }
            | EntryKind::Multiply { .. }
            | EntryKind::Divide { .. }
            | EntryKind::Recip { .. }
            | EntryKind::Window { .. }
            | EntryKind::Mplex { .. }
            | EntryKind::Index => Err(CoreError::non_invertible(&entry.code)),
        }
    }

    fn write_raw(
        &mut self,
        entry: &Entry,
        raw_type: DataType,
        s0: u64,
        ns: usize,
        ty: DataType,
        data: &[u8],
    ) -> CoreResult<usize> {
        let fragment = self
            .fragments
            .get_mut(entry.fragment_index)
            .ok_or_else(|| CoreError::internal(format!("{} has no fragment", entry.code)))?;
        if fragment.protection.protects_data() {
            return Err(CoreError::access_denied(format!(
                "{} is in data-protected fragment {}",
                entry.code, fragment.index
            )));
        }

        let foreign = fragment.endianness.needs_swap();
        let mut raw = convert_to_vec(data, ty, raw_type, ns)?;

        let request = ChannelRequest {
            code: &entry.code,
            root: &self.root,
            writing: true,
        };
        let channel = self.channels.acquire(request, fragment, &self.registry)?;
        let file = channel.file();
        if foreign && file.byte_oriented() {
            swap_in_place(&mut raw, raw_type, ns);
        }
        file.seek(s0, raw_type, true)?;
        Ok(file.write(&raw, raw_type, ns)?)
    }

    /// Writes through `y = m x + b` by storing `(y - b) / m` in `input`.
    fn write_linear<W: Working>(
        &mut self,
        input: &str,
        m: f64,
        b: f64,
        s0: u64,
        ns: usize,
        ty: DataType,
        data: &[u8],
    ) -> CoreResult<usize> {
        let (m, b) = (W::from_f64(m), W::from_f64(b));
        let x: Vec<W> = decode::<W>(data, ty, ns)?
            .into_iter()
            .map(|y| (y - b) / m)
            .collect();
        self.write_samples(input, s0, ns, W::DATA_TYPE, &to_bytes(&x))
    }

    /// Read-modify-write of a bit span. Samples the input does not have yet
    /// read as zero.
    fn write_bits(
        &mut self,
        input: &str,
        bitnum: u32,
        numbits: u32,
        s0: u64,
        values: &[u64],
    ) -> CoreResult<usize> {
        let mut words: Vec<u64> = match self.read_as(input, s0, values.len()) {
            Ok(words) => words,
            Err(e) if e.is_missing_data() => Vec::new(),
            Err(e) => return Err(e),
        };
        words.resize(values.len(), 0);

        let mask = bit_mask(numbits) << bitnum;
        for (word, &v) in words.iter_mut().zip(values) {
            *word = (*word & !mask) | ((v << bitnum) & mask);
        }
        self.write_samples(input, s0, words.len(), DataType::UInt64, &to_bytes(&words))
    }

    /// Checks that the fragment defining a literal may be modified.
    fn literal_fragment(&mut self, entry: &Entry) -> CoreResult<&mut Fragment> {
        let fragment = self
            .fragments
            .get_mut(entry.fragment_index)
            .ok_or_else(|| CoreError::internal(format!("{} has no fragment", entry.code)))?;
        if fragment.protection.protects_format() {
            return Err(CoreError::access_denied(format!(
                "{} is in format-protected fragment {}",
                entry.code, fragment.index
            )));
        }
        Ok(fragment)
    }

    /// Replaces the whole value of a STRING field.
    pub(crate) fn replace_string(&mut self, entry: &Entry, text: &str) -> CoreResult<()> {
        self.literal_fragment(entry)?;
        match self.table.get_mut(&entry.code).map(|target| &mut target.kind) {
            Some(EntryKind::String { value }) => text.clone_into(value),
            _ => return Err(CoreError::internal(format!("{} is not a STRING", entry.code))),
        }
        let fragment = self.literal_fragment(entry)?;
        fragment.modified = true;
        debug!(field = %entry.code, fragment = fragment.index, "string replaced");
        Ok(())
    }

    fn write_literal(
        &mut self,
        entry: &Entry,
        s0: u64,
        ns: usize,
        ty: DataType,
        data: &[u8],
    ) -> CoreResult<usize> {
        self.literal_fragment(entry)?;
        let target = self
            .table
            .get_mut(&entry.code)
            .ok_or_else(|| CoreError::internal(format!("{} vanished from the table", entry.code)))?;

        let start = usize::try_from(s0)
            .map_err(|_| CoreError::range(format!("sample {s0} is out of range")))?;
        let n = match &mut target.kind {
            EntryKind::Const { value } => {
                if ns > 0 {
                    value.write_slice(0, 1, ty, data)?;
                }
                ns.min(1)
            }
            EntryKind::CArray { values } => {
                values.write_slice(start, ns, ty, data)?;
                ns
            }
            EntryKind::String { value } => {
                if !matches!(ty, DataType::UInt8 | DataType::Int8) {
                    return Err(CoreError::unsupported_field_type(
                        &entry.code,
                        format!("STRING cannot be written as {ty}"),
                    ));
                }
                let mut bytes = value.as_bytes().to_vec();
                let at = start.min(bytes.len());
                let end = at.saturating_add(ns).min(bytes.len());
                bytes.splice(at..end, data[..ns].iter().copied());
                *value = String::from_utf8_lossy(&bytes).into_owned();
                ns
            }
            _ => {
                return Err(CoreError::internal(format!(
                    "{} is not a literal",
                    entry.code
                )))
            }
        };

        let fragment = self.literal_fragment(entry)?;
        fragment.modified = true;
        debug!(field = %entry.code, fragment = fragment.index, "literal updated");
        Ok(n)
    }
}
