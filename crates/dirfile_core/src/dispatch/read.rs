//! The read half of the dispatcher.

use super::shift_start;
use crate::channel::ChannelRequest;
use crate::dirfile::Dirfile;
use crate::entry::{Entry, EntryKind, WindowOp};
use crate::error::{CoreError, CoreResult};
use crate::working::{polynomial, Working};
use dirfile_types::{convert, swap_in_place, to_bytes, Complex, DataType};
use tracing::trace;

/// Mask of the low `numbits` bits.
pub(crate) fn bit_mask(numbits: u32) -> u64 {
    if numbits >= 64 {
        u64::MAX
    } else {
        (1u64 << numbits) - 1
    }
}

/// Extracts a bit span, sign-extending it when `signed`.
fn extract_bits(word: u64, bitnum: u32, numbits: u32, signed: bool) -> i128 {
    let bits = (word >> bitnum) & bit_mask(numbits);
    if signed {
        let unused = 64 - numbits;
        i128::from(((bits << unused) as i64) >> unused)
    } else {
        i128::from(bits)
    }
}

/// Converts computed samples to the caller's type.
fn finish<W: Working>(values: &[W], ty: DataType, out: &mut [u8]) -> CoreResult<usize> {
    convert(&to_bytes(values), W::DATA_TYPE, out, ty, values.len())?;
    Ok(values.len())
}

impl Dirfile {
    /// Reads `ns` samples of `code` starting at absolute sample `s0` into
    /// `out` as type `ty`. Returns the number of samples read.
    pub(crate) fn read_samples(
        &mut self,
        code: &str,
        s0: u64,
        ns: usize,
        ty: DataType,
        out: &mut [u8],
    ) -> CoreResult<usize> {
        let mut d = self.descend(code)?;
        let entry = d.lookup(code)?;
        trace!(field = code, s0, ns, %ty, "read");
        d.read_entry(&entry, s0, ns, ty, out)
    }

    fn read_entry(
        &mut self,
        entry: &Entry,
        s0: u64,
        ns: usize,
        ty: DataType,
        out: &mut [u8],
    ) -> CoreResult<usize> {
        match &entry.kind {
            EntryKind::Raw { data_type, spf } => {
                let start = self.file_sample(&entry.code, s0, *spf)?;
                self.read_raw(entry, *data_type, start, ns, ty, out)
            }
            EntryKind::Phase { input, shift } => {
                let start = shift_start(s0, *shift)?;
                self.read_samples(input, start, ns, ty, out)
            }
            EntryKind::Bit {
                input,
                bitnum,
                numbits,
            } => self.read_bits(input, *bitnum, *numbits, false, s0, ns, ty, out),
            EntryKind::SignedBit {
                input,
                bitnum,
                numbits,
            } => self.read_bits(input, *bitnum, *numbits, true, s0, ns, ty, out),
            EntryKind::Const { value } => {
                if ns == 0 {
                    return Ok(0);
                }
                value.read_slice(0, 1, ty, out)?;
                Ok(1)
            }
            EntryKind::CArray { values } => {
                let start = usize::try_from(s0).unwrap_or(usize::MAX);
                let n = ns.min(values.len().saturating_sub(start));
                if n > 0 {
                    values.read_slice(start, n, ty, out)?;
                }
                Ok(n)
            }
            EntryKind::String { value } => {
                if !matches!(ty, DataType::UInt8 | DataType::Int8) {
                    return Err(CoreError::unsupported_field_type(
                        &entry.code,
                        format!("STRING cannot be read as {ty}"),
                    ));
                }
                let bytes = value.as_bytes();
                let start = usize::try_from(s0).unwrap_or(usize::MAX).min(bytes.len());
                let n = ns.min(bytes.len() - start);
                out[..n].copy_from_slice(&bytes[start..start + n]);
                Ok(n)
            }
            _ if ty.is_complex() => {
                let values = self.compute::<Complex<f64>>(entry, s0, ns)?;
                finish(&values, ty, out)
            }
            _ => {
                let values = self.compute::<f64>(entry, s0, ns)?;
                finish(&values, ty, out)
            }
        }
    }

    fn read_raw(
        &mut self,
        entry: &Entry,
        raw_type: DataType,
        s0: u64,
        ns: usize,
        ty: DataType,
        out: &mut [u8],
    ) -> CoreResult<usize> {
        let fragment = self
            .fragments
            .get_mut(entry.fragment_index)
            .ok_or_else(|| CoreError::internal(format!("{} has no fragment", entry.code)))?;
        let foreign = fragment.endianness.needs_swap();
        let request = ChannelRequest {
            code: &entry.code,
            root: &self.root,
            writing: false,
        };
        let channel = self.channels.acquire(request, fragment, &self.registry)?;
        let file = channel.file();
        let swap = foreign && file.byte_oriented();
        file.seek(s0, raw_type, false)?;

        if raw_type == ty && !swap {
            return Ok(file.read(out, ty, ns)?);
        }

        let mut raw = vec![0u8; raw_type.bytes_for(ns)];
        let n = file.read(&mut raw, raw_type, ns)?;
        if swap {
            swap_in_place(&mut raw, raw_type, n);
        }
        convert(&raw, raw_type, out, ty, n)?;
        Ok(n)
    }

    fn read_bits(
        &mut self,
        input: &str,
        bitnum: u32,
        numbits: u32,
        signed: bool,
        s0: u64,
        ns: usize,
        ty: DataType,
        out: &mut [u8],
    ) -> CoreResult<usize> {
        let words: Vec<u64> = self.read_as(input, s0, ns)?;
        let (bytes, word_type) = if signed {
            let v: Vec<i64> = words
                .iter()
                .map(|&w| extract_bits(w, bitnum, numbits, true) as i64)
                .collect();
            (to_bytes(&v), DataType::Int64)
        } else {
            let v: Vec<u64> = words
                .iter()
                .map(|&w| extract_bits(w, bitnum, numbits, false) as u64)
                .collect();
            (to_bytes(&v), DataType::UInt64)
        };
        convert(&bytes, word_type, out, ty, words.len())?;
        Ok(words.len())
    }

    /// Evaluates an arithmetic field in working type `W`.
    fn compute<W: Working>(&mut self, entry: &Entry, s0: u64, ns: usize) -> CoreResult<Vec<W>> {
        match &entry.kind {
            EntryKind::Lincom { terms } => {
                let Some(first) = terms.first() else {
                    return Err(CoreError::internal(format!("{} has no terms", entry.code)));
                };
                let spf = self.spf_of(&first.field)?;
                let mut acc: Option<Vec<W>> = None;
                for term in terms {
                    let x: Vec<W> = self.read_aligned(&term.field, s0, ns, spf)?;
                    let (m, b) = (W::from_f64(term.m), W::from_f64(term.b));
                    acc = Some(match acc {
                        None => x.into_iter().map(|v| v * m + b).collect(),
                        Some(sum) => sum
                            .into_iter()
                            .zip(x)
                            .map(|(s, v)| s + v * m + b)
                            .collect(),
                    });
                }
                Ok(acc.unwrap_or_default())
            }
            EntryKind::Linterp { input, .. } => {
                let table = self.linterp_table(entry)?;
                let x: Vec<f64> = self.read_as(input, s0, ns)?;
                Ok(x.into_iter()
                    .map(|v| W::from_f64(table.interpolate(v)))
                    .collect())
            }
            EntryKind::Polynom { input, a } => {
                let x: Vec<W> = self.read_as(input, s0, ns)?;
                Ok(x.into_iter().map(|v| polynomial(a, v)).collect())
            }
            EntryKind::Multiply { a, b } | EntryKind::Divide { a, b } => {
                let spf = self.spf_of(a)?;
                let lhs: Vec<W> = self.read_as(a, s0, ns)?;
                let rhs: Vec<W> = self.read_aligned(b, s0, ns, spf)?;
                let divide = matches!(entry.kind, EntryKind::Divide { .. });
                Ok(lhs
                    .into_iter()
                    .zip(rhs)
                    .map(|(x, y)| if divide { x / y } else { x * y })
                    .collect())
            }
            EntryKind::Recip { input, dividend } => {
                let x: Vec<W> = self.read_as(input, s0, ns)?;
                let dividend = W::from_f64(*dividend);
                Ok(x.into_iter().map(|v| dividend / v).collect())
            }
            EntryKind::Window {
                input,
                check,
                op,
                threshold,
            } => self.compute_window(input, check, *op, *threshold, s0, ns),
            EntryKind::Mplex {
                input,
                count,
                count_val,
                period,
            } => self.compute_mplex(input, count, *count_val, *period, s0, ns),
            EntryKind::Index => Ok((0..ns as u64)
                .map(|i| W::from_f64(s0.saturating_add(i) as f64))
                .collect()),
            EntryKind::Raw { .. }
            | EntryKind::Bit { .. }
            | EntryKind::SignedBit { .. }
            | EntryKind::Phase { .. }
            | EntryKind::Const { .. }
            | EntryKind::CArray { .. }
            | EntryKind::String { .. } => Err(CoreError::internal(format!(
                "{} is not an arithmetic field",
                entry.code
            ))),
        }
    }

    fn compute_window<W: Working>(
        &mut self,
        input: &str,
        check: &str,
        op: WindowOp,
        threshold: f64,
        s0: u64,
        ns: usize,
    ) -> CoreResult<Vec<W>> {
        let spf = self.spf_of(input)?;
        let values: Vec<W> = self.read_as(input, s0, ns)?;
        let checks: Vec<f64> = self.read_aligned(check, s0, ns, spf)?;
        Ok(values
            .into_iter()
            .zip(checks)
            .map(|(v, c)| if op.admits(c, threshold) { v } else { W::nan() })
            .collect())
    }

    fn compute_mplex<W: Working>(
        &mut self,
        input: &str,
        count: &str,
        count_val: i64,
        period: usize,
        s0: u64,
        ns: usize,
    ) -> CoreResult<Vec<W>> {
        let lookback = if period > 0 {
            period
        } else {
            self.config.mplex_lookback
        };
        let lead = s0.min(lookback as u64);
        let start = s0 - lead;
        let span = ns + lead as usize;

        let spf = self.spf_of(input)?;
        let values: Vec<W> = self.read_as(input, start, span)?;
        let counts: Vec<i64> = self.read_aligned(count, start, span, spf)?;

        let mut current = W::from_f64(0.0);
        let mut out = Vec::with_capacity(ns);
        for (k, (v, c)) in values.into_iter().zip(counts).enumerate() {
            if c == count_val {
                current = v;
            }
            if k as u64 >= lead {
                out.push(current);
            }
        }
        Ok(out)
    }
}
