#![deny(missing_docs)]

//! The Strata schema model.
//!
//! A [`Schema`] is an ordered list of top-level [`Column`]s. Every column has a [`Repetition`]
//! and is either a leaf carrying a [`PhysicalType`] (optionally refined by a [`LogicalType`]) or a
//! group with a [`GroupShape`]. Lists and maps use the three-level layout:
//!
//! ```text
//! optional group tags (LIST) {
//!   repeated group list {
//!     optional binary element (STRING);
//!   }
//! }
//! ```
//!
//! The schema also acts as the level calculator: every leaf is described by a
//! [`LeafDescriptor`] carrying its maximum definition and repetition [`Levels`].

pub use column::*;
pub use levels::*;
pub use logical::*;
pub use path::*;
pub use physical::*;
pub use repetition::*;
pub use schema::*;

mod column;
mod ddl;
mod levels;
mod logical;
mod path;
mod physical;
pub mod proto;
mod repetition;
mod schema;
