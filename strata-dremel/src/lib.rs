//! Record shredding and assembly.
//!
//! [`shred_row`] flattens a nested [`Row`](strata_scalar::Row) into one stream of
//! `(definition level, repetition level, value)` triples per leaf column. An [`Assembler`] reads
//! those streams back through [`TripleSource`]s and rebuilds the rows, materializing only the
//! leaves named by a [`Projection`].
//!
//! A triple carries a value only when its definition level equals the leaf's maximum; lower
//! definition levels mark the depth at which an optional or repeated ancestor was missing or
//! empty. Repetition level 0 starts a new row.

pub use assemble::*;
pub use column::*;
pub use projection::*;
pub use shred::*;

mod assemble;
mod column;
mod projection;
mod shred;
