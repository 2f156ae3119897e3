//! Layout substrate shared by every extractor: visual rows and wrapped
//! label blocks, both rebuilt from the raw spans of one request.

pub mod blocks;
pub mod rows;

pub use blocks::{build_blocks, find_block, find_nearest_below, BlockQuery, BlockScope};
pub use rows::{group_spans, row_containing, ROW_THRESHOLD};
