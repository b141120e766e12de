//! Reading datasets and writing results
//!
//! Thin collaborators around the core: nothing in [`crate::mixture`] depends
//! on this module.

mod csv;
mod report;

pub use csv::{LABEL_COLUMN, load_csv, parse_csv, write_results, write_results_csv};
pub use report::{format_report, timing_line};
