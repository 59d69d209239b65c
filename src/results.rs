mod result_set;
mod row;

pub use result_set::{ResultSet, build_result_set};
pub use row::{ColumnIndex, Row};
