pub mod reader;
pub mod stations;
pub mod writer;

pub use reader::*;
pub use stations::*;
pub use writer::*;
