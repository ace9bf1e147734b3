mod column;
mod options;
mod writer;

pub use options::*;
pub use writer::*;
