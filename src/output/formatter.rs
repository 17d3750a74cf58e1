//! Summary formatters
//!
//! Provides the plain text summary and JSON output.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::stats::Statistics;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            _ => None,
        }
    }
}

/// Everything reported at the end of a session
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub work_items: usize,
    pub concurrency: usize,
    pub all_passed: bool,
    #[serde(flatten)]
    pub statistics: Statistics,
}

impl SessionSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        work_items: usize,
        concurrency: usize,
        statistics: Statistics,
    ) -> Self {
        Self {
            started_at,
            work_items,
            concurrency,
            all_passed: statistics.all_passed(),
            statistics,
        }
    }
}

/// Summary formatter
pub struct SummaryFormatter {
    format: OutputFormat,
}

impl SummaryFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, summary: &SessionSummary) -> String {
        match self.format {
            OutputFormat::Text => self.format_text(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
        }
    }

    fn format_text(&self, summary: &SessionSummary) -> String {
        let stats = &summary.statistics;
        let mut text = stats.to_string();
        if stats.failed_runs > 0 {
            text.push_str(&format!(
                "\n{} of {} run(s) exited with an error",
                stats.failed_runs, stats.runs
            ));
        }
        text
    }
}
