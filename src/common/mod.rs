mod fs;
mod json;

pub use fs::assert_not_stdout;
pub(crate) use fs::*;
pub use json::{read_json_file, write_json_file};
