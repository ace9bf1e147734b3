//! Fixed width, least-significant-bit first packing of small unsigned integers.

use strata_error::{StrataResult, strata_bail};

/// Number of bits needed to represent `max`.
pub fn bit_width(max: u32) -> u8 {
    #[allow(clippy::cast_possible_truncation)]
    let width = (u32::BITS - max.leading_zeros()) as u8;
    width
}

/// Number of bytes occupied by `count` values packed at `width` bits.
pub fn packed_len(count: usize, width: u8) -> usize {
    (count * usize::from(width)).div_ceil(8)
}

/// Append `values` packed at `width` bits each. Values must fit in `width` bits.
pub fn pack_into(values: &[u32], width: u8, out: &mut Vec<u8>) {
    if width == 0 {
        return;
    }
    let mut acc: u64 = 0;
    let mut bits: u32 = 0;
    for &v in values {
        acc |= u64::from(v) << bits;
        bits += u32::from(width);
        while bits >= 8 {
            out.push((acc & 0xFF) as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        out.push((acc & 0xFF) as u8);
    }
}

/// Append `count` values of `width` bits read from the front of `data`.
pub fn unpack_into(data: &[u8], width: u8, count: usize, out: &mut Vec<u32>) -> StrataResult<()> {
    if width > 32 {
        strata_bail!(Corrupted: "Bit width {} exceeds 32", width);
    }
    if width == 0 {
        out.extend(std::iter::repeat_n(0, count));
        return Ok(());
    }
    let needed = packed_len(count, width);
    if data.len() < needed {
        strata_bail!(
            Corrupted: "Bit-packed run needs {} bytes but only {} remain",
            needed,
            data.len()
        );
    }
    let mask: u64 = (1u64 << width) - 1;
    let mut acc: u64 = 0;
    let mut bits: u32 = 0;
    let mut bytes = data.iter();
    for _ in 0..count {
        while bits < u32::from(width) {
            let Some(&byte) = bytes.next() else {
                strata_bail!(Corrupted: "Bit-packed run is truncated");
            };
            acc |= u64::from(byte) << bits;
            bits += 8;
        }
        #[allow(clippy::cast_possible_truncation)]
        out.push((acc & mask) as u32);
        acc >>= width;
        bits -= u32::from(width);
    }
    Ok(())
}
