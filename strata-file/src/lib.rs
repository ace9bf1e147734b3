#![allow(clippy::cast_possible_truncation)]
//! Read and write Strata files.
//!
//! A Strata file stores rows of a nested [`Schema`](strata_schema::Schema) column by column.
//! Rows are buffered into row groups; within a row group every leaf column is shredded into
//! definition levels, repetition levels and values, which are encoded and compressed into pages.
//!
//! # Writing
//!
//! Files are written with a [`Writer`], configured through [`WriteOptions`]. Rows are validated
//! against the schema before they are buffered, so a row that breaks the schema never reaches
//! the file. The footer is written once, when the writer is closed.
//!
//! # Reading
//!
//! Files are opened with a [`Reader`], which parses the footer up front. Rows are then read with
//! [`StrataFile::scan`], which can restrict the columns and the row window. Pages are only
//! fetched and decoded once the iteration reaches them, and row groups that lie entirely before
//! the requested offset are never touched.
//!
//! # File Format
//!
//! ```text
//! ┌────────────────────────────┐
//! │     4-byte magic "STR1"    │
//! ├────────────────────────────┤
//! │        Row group 0         │
//! │  column chunk 0: pages...  │
//! │  column chunk 1: pages...  │
//! ├────────────────────────────┤
//! │            ...             │
//! ├────────────────────────────┤
//! │      Footer (protobuf)     │
//! │ schema, row groups, chunks,│
//! │   page headers, statistics │
//! ├────────────────────────────┤
//! │ u32 LE footer length       │
//! │ 4-byte magic "STR1"        │
//! └────────────────────────────┘
//! ```
//!
//! Pages are not self-delimiting; their offsets and sizes live only in the footer. A data page
//! body holds, in order, the repetition levels and the definition levels (each as a u32 LE byte
//! length followed by the RLE/bit-packed hybrid stream, and omitted when the column's maximum
//! level is zero), then the values.

mod footer;
mod read;
mod statistics;
#[cfg(test)]
mod tests;
mod validate;
mod write;

pub use footer::*;
pub use forever_constant::*;
pub use read::*;
pub use statistics::*;
pub use validate::*;
pub use write::*;

/// The current version of the Strata file format
pub const VERSION: u32 = 1;

/// Constants that will never change (i.e., doing so would break backwards compatibility)
mod forever_constant {
    /// The extension for Strata files
    pub const STRATA_FILE_EXTENSION: &str = "strata";

    /// The magic bytes at the start and end of a Strata file
    pub const MAGIC_BYTES: [u8; 4] = *b"STR1";
    /// The size of the end of file marker in bytes: footer length followed by the magic
    pub const EOF_SIZE: usize = 8;

}
