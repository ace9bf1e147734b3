//! Definition and repetition level streams.

use strata_error::{StrataResult, strata_bail};

use crate::bitpack::bit_width;
use crate::rle::{hybrid_decode, hybrid_encode};

/// Encode levels with the hybrid scheme at the width required by `max_level`.
pub fn encode_levels(levels: &[u16], max_level: u16) -> Vec<u8> {
    let values: Vec<u32> = levels.iter().map(|&l| u32::from(l)).collect();
    hybrid_encode(&values, bit_width(max_level.into()))
}

/// Decode `count` levels, rejecting any that exceed `max_level`.
pub fn decode_levels(data: &[u8], max_level: u16, count: usize) -> StrataResult<Vec<u16>> {
    let values = hybrid_decode(data, bit_width(max_level.into()), count)?;
    values
        .into_iter()
        .map(|v| match u16::try_from(v) {
            Ok(level) if level <= max_level => Ok(level),
            _ => strata_bail!(Corrupted: "Level {} exceeds the maximum of {}", v, max_level),
        })
        .collect()
}
