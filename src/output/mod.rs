//! Output formatting module
//!
//! Renders the end-of-session summary.

mod formatter;

pub use formatter::{OutputFormat, SessionSummary, SummaryFormatter};
