//! Column and segment resolution.
//!
//! [`ColumnSpec`] decides which columns an authored step is expanded over and
//! [`SegmentSpec`] decides which row subsets each of those columns is checked
//! in. Both are resolved when a plan is interrogated, against the table the
//! step actually reads.

pub mod columns;
pub mod segments;

pub use columns::{ColumnSelector, ColumnSpec};
pub use segments::{Segment, SegmentSpec};
