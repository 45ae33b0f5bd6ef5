pub mod cursor;
pub mod parser;

pub use cursor::LineCursor;
pub use parser::{DvhParser, ParseOptions, load_plan};
