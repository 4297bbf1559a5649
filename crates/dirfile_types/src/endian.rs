//! Byte-order normalization.

use crate::data_type::DataType;

/// Reverses the byte order of each of the first `count` samples in `buf`.
///
/// Complex samples are swapped component by component, so a buffer in the
/// opposite byte order becomes native (and vice versa).
pub fn swap_in_place(buf: &mut [u8], ty: DataType, count: usize) {
    let width = ty.component_size();
    if width == 1 {
        return;
    }
    let components = if ty.is_complex() { count * 2 } else { count };
    let len = (components * width).min(buf.len());
    for chunk in buf[..len].chunks_exact_mut(width) {
        chunk.reverse();
    }
}

/// True when this host stores multi-byte values big-endian first.
#[must_use]
pub const fn host_is_big_endian() -> bool {
    cfg!(target_endian = "big")
}
