//! Human-readable rendering of engine outputs.

pub mod report;

pub use report::{format_report, format_series};
