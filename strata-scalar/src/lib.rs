//! Values flowing in and out of Strata files.
//!
//! A [`Row`] is an ordered list of named top-level [`Value`]s. Values form a closed tree: scalars
//! tagged by their physical representation, plus lists, maps and structs. Logical types only
//! refine interpretation, so a date is an [`Value::Int32`] holding days since the epoch and a
//! UUID is a [`Value::String`].

mod display;
mod row;
mod value;

pub use row::*;
pub use value::*;
