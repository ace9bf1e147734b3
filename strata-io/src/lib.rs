//! Core traits and implementations for blocking IO.
//!
//! Strata files are read with positional reads against a [`ReadAt`] and written sequentially
//! through an [`OffsetWriter`], which remembers where every page and footer landed.

pub use read::*;
pub use write::*;

mod read;
mod write;
