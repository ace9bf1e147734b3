mod page;
mod reader;
mod scan;

pub use reader::*;
pub use scan::*;
