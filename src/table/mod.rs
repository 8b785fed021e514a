mod merge;
mod row;
mod value;

pub use merge::{MergeOutcome, merge};
pub use row::{Row, Table};
pub use value::Value;
