//! Database writes
//!
//! Live tables are only ever replaced whole: see [`replace::replace_table`].

pub mod records;
pub mod replace;

pub use records::TableRecord;
pub use replace::{replace_table, ReplaceReport, ReplaceState, ShadowTables};
