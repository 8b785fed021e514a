mod cache;
mod hint;

pub use cache::{MICROGRAPHS_BLOCK, ProgressCache};
pub use hint::{HINT_FILE_NAME, ProgressHint, read_hint, write_hint};
