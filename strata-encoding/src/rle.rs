//! The run-length / bit-packed hybrid encoding.
//!
//! The stream is a sequence of runs, each introduced by a ULEB128 varint header:
//!
//! * `header & 1 == 0`: an RLE run of `header >> 1` repetitions of a single value, stored
//!   little-endian in `ceil(bit_width / 8)` bytes.
//! * `header & 1 == 1`: `header >> 1` groups of 8 values bit-packed at `bit_width` bits,
//!   least-significant bit first.
//!
//! The number of values is not stored; callers know it from the page header. A trailing
//! bit-packed group may be padded with zeros.

use std::iter;

use strata_error::{StrataResult, strata_bail, strata_err};

use crate::bitpack::{pack_into, packed_len, unpack_into};

/// Shortest run written as an RLE run instead of being bit-packed.
const MIN_RLE_RUN: usize = 8;
/// Values per bit-packed group.
const GROUP_SIZE: usize = 8;

/// Encode `values`, each of which must fit in `bit_width` bits.
pub fn hybrid_encode(values: &[u32], bit_width: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let mut literals: Vec<u32> = Vec::new();
    let mut idx = 0;

    while idx < values.len() {
        let value = values[idx];
        let mut run = values[idx..].iter().take_while(|&&v| v == value).count();

        if run < MIN_RLE_RUN {
            literals.extend_from_slice(&values[idx..idx + run]);
            idx += run;
            continue;
        }

        // Top up the pending literals to a whole group so they can be flushed before the run.
        let fill = (GROUP_SIZE - literals.len() % GROUP_SIZE) % GROUP_SIZE;
        literals.extend(iter::repeat_n(value, fill));
        run -= fill;
        idx += fill;
        flush_literals(&mut literals, bit_width, &mut out);

        if run >= MIN_RLE_RUN {
            write_rle_run(run, value, bit_width, &mut out);
        } else {
            literals.extend(iter::repeat_n(value, run));
        }
        idx += run;
    }
    flush_literals(&mut literals, bit_width, &mut out);
    out
}

/// Decode exactly `count` values from the front of `data`.
pub fn hybrid_decode(data: &[u8], bit_width: u8, count: usize) -> StrataResult<Vec<u32>> {
    if bit_width > 32 {
        strata_bail!(Corrupted: "Hybrid bit width {} exceeds 32", bit_width);
    }
    let value_bytes = usize::from(bit_width).div_ceil(8);
    let mut out = Vec::with_capacity(count);
    let mut pos = 0;

    while out.len() < count {
        let header = read_uleb128(data, &mut pos)?;
        let remaining = count - out.len();
        if header & 1 == 1 {
            let groups = usize::try_from(header >> 1)
                .map_err(|_| strata_err!(Corrupted: "Bit-packed run header {} is too large", header))?;
            if groups == 0 {
                strata_bail!(Corrupted: "Empty bit-packed run");
            }
            let num_values = groups * GROUP_SIZE;
            let byte_len = packed_len(num_values, bit_width);
            let end = pos
                .checked_add(byte_len)
                .filter(|&end| end <= data.len())
                .ok_or_else(|| strata_err!(Corrupted: "Bit-packed run is truncated"))?;
            unpack_into(
                &data[pos..end],
                bit_width,
                num_values.min(remaining),
                &mut out,
            )?;
            pos = end;
        } else {
            let run = usize::try_from(header >> 1)
                .map_err(|_| strata_err!(Corrupted: "RLE run header {} is too large", header))?;
            if run == 0 {
                strata_bail!(Corrupted: "Empty RLE run");
            }
            if pos + value_bytes > data.len() {
                strata_bail!(Corrupted: "RLE run value is truncated");
            }
            let mut le = [0u8; 4];
            le[..value_bytes].copy_from_slice(&data[pos..pos + value_bytes]);
            pos += value_bytes;
            out.extend(iter::repeat_n(u32::from_le_bytes(le), run.min(remaining)));
        }
    }
    Ok(out)
}

fn flush_literals(literals: &mut Vec<u32>, bit_width: u8, out: &mut Vec<u8>) {
    if literals.is_empty() {
        return;
    }
    let groups = literals.len().div_ceil(GROUP_SIZE);
    literals.resize(groups * GROUP_SIZE, 0);
    write_uleb128(((groups as u64) << 1) | 1, out);
    pack_into(literals, bit_width, out);
    literals.clear();
}

fn write_rle_run(run: usize, value: u32, bit_width: u8, out: &mut Vec<u8>) {
    write_uleb128((run as u64) << 1, out);
    let value_bytes = usize::from(bit_width).div_ceil(8);
    out.extend_from_slice(&value.to_le_bytes()[..value_bytes]);
}

fn write_uleb128(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn read_uleb128(data: &[u8], pos: &mut usize) -> StrataResult<u64> {
    let mut value: u64 = 0;
    for shift in (0..64).step_by(7) {
        let Some(&byte) = data.get(*pos) else {
            strata_bail!(Corrupted: "Hybrid run header is truncated");
        };
        *pos += 1;
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(strata_err!(Corrupted: "Hybrid run header is longer than 10 bytes"))
}
