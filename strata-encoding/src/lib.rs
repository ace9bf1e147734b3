//! Value and level encodings used inside Strata pages.
//!
//! * [`plain`]: fixed width little-endian values, bit-packed booleans and length-prefixed byte
//!   arrays.
//! * [`dict`]: per column chunk dictionaries whose indices are written with the hybrid scheme.
//! * [`rle`]: the run-length / bit-packed hybrid used for definition levels, repetition levels
//!   and dictionary indices.

pub use encoding::*;

pub mod bitpack;
pub mod dict;
mod encoding;
pub mod levels;
pub mod plain;
pub mod rle;
